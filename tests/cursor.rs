#![allow(missing_docs)]
use signet_kvdb::*;
use std::{borrow::Cow, hint::black_box};
use tempfile::tempdir;

/// Convenience
type Result<T> = ReadResult<T>;

fn collect_keys<K: TransactionKind>(cursor: &mut Cursor<'_, K>) -> Vec<Vec<u8>> {
    cursor.iter_keys::<Vec<u8>>().unwrap().collect::<Result<Vec<_>>>().unwrap()
}

#[test]
fn test_get() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap();

    assert_eq!(None, txn.cursor(db).unwrap().first::<(), ()>().unwrap());

    txn.put(db, b"key1", b"val1", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val2", WriteFlags::empty()).unwrap();
    txn.put(db, b"key3", b"val3", WriteFlags::empty()).unwrap();

    let mut cursor = txn.cursor(db).unwrap();
    assert_eq!(cursor.first().unwrap(), Some((*b"key1", *b"val1")));
    assert_eq!(cursor.get_current().unwrap(), Some((*b"key1", *b"val1")));
    assert_eq!(cursor.next().unwrap(), Some((*b"key2", *b"val2")));
    assert_eq!(cursor.prev().unwrap(), Some((*b"key1", *b"val1")));
    assert_eq!(cursor.last().unwrap(), Some((*b"key3", *b"val3")));
    assert_eq!(cursor.set(b"key1").unwrap(), Some(*b"val1"));
    assert_eq!(cursor.set_key(b"key3").unwrap(), Some((*b"key3", *b"val3")));
    assert_eq!(cursor.set_range(b"key2\0").unwrap(), Some((*b"key3", *b"val3")));
}

#[test]
fn test_get_dup() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
    txn.put(db, b"key1", b"val1", WriteFlags::empty()).unwrap();
    txn.put(db, b"key1", b"val2", WriteFlags::empty()).unwrap();
    txn.put(db, b"key1", b"val3", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val1", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val2", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val3", WriteFlags::empty()).unwrap();

    let mut cursor = txn.cursor(db).unwrap();
    assert_eq!(cursor.first().unwrap(), Some((*b"key1", *b"val1")));
    assert_eq!(cursor.first_dup().unwrap(), Some(*b"val1"));
    assert_eq!(cursor.get_current().unwrap(), Some((*b"key1", *b"val1")));
    assert_eq!(cursor.next_nodup().unwrap(), Some((*b"key2", *b"val1")));
    assert_eq!(cursor.next().unwrap(), Some((*b"key2", *b"val2")));
    assert_eq!(cursor.prev().unwrap(), Some((*b"key2", *b"val1")));
    assert_eq!(cursor.next_dup().unwrap(), Some((*b"key2", *b"val2")));
    assert_eq!(cursor.next_dup().unwrap(), Some((*b"key2", *b"val3")));
    assert_eq!(cursor.next_dup::<(), ()>().unwrap(), None);
    assert_eq!(cursor.prev_dup().unwrap(), Some((*b"key2", *b"val2")));
    assert_eq!(cursor.last_dup().unwrap(), Some(*b"val3"));
    assert_eq!(cursor.prev_nodup().unwrap(), Some((*b"key1", *b"val3")));
    assert_eq!(cursor.next_dup::<(), ()>().unwrap(), None);
    assert_eq!(cursor.set(b"key1").unwrap(), Some(*b"val1"));
    assert_eq!(cursor.set(b"key2").unwrap(), Some(*b"val1"));
    assert_eq!(cursor.set_range(b"key1\0").unwrap(), Some((*b"key2", *b"val1")));
    assert_eq!(cursor.get_both(b"key1", b"val3").unwrap(), Some(*b"val3"));
    assert_eq!(cursor.get_both_range::<()>(b"key1", b"val4").unwrap(), None);
    assert_eq!(cursor.get_both_range(b"key2", b"val").unwrap(), Some(*b"val1"));
    assert_eq!(cursor.count().unwrap(), 3);

    assert_eq!(cursor.last().unwrap(), Some((*b"key2", *b"val3")));
    cursor.del(WriteFlags::empty()).unwrap();
    assert_eq!(cursor.last().unwrap(), Some((*b"key2", *b"val2")));
    cursor.del(WriteFlags::empty()).unwrap();
    assert_eq!(cursor.last().unwrap(), Some((*b"key2", *b"val1")));
    cursor.del(WriteFlags::empty()).unwrap();
    assert_eq!(cursor.last().unwrap(), Some((*b"key1", *b"val3")));
}

#[test]
fn test_get_dupfixed() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.create_db(None, DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED).unwrap();
    txn.put(db, b"key1", b"val1", WriteFlags::empty()).unwrap();
    txn.put(db, b"key1", b"val2", WriteFlags::empty()).unwrap();
    txn.put(db, b"key1", b"val3", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val4", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val5", WriteFlags::empty()).unwrap();
    txn.put(db, b"key2", b"val6", WriteFlags::empty()).unwrap();

    let err = txn.put(db, b"key1", b"long value", WriteFlags::empty()).unwrap_err();
    assert!(matches!(err, KvError::BadValSize));

    let mut cursor = txn.cursor(db).unwrap();
    assert_eq!(cursor.first().unwrap(), Some((*b"key1", *b"val1")));
    assert_eq!(cursor.get_multiple().unwrap(), Some(*b"val1val2val3"));
    assert_eq!(cursor.next_multiple::<(), ()>().unwrap(), None);
}

#[test]
fn test_iter() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let items: Vec<(_, _)> = vec![
        (*b"key1", *b"val1"),
        (*b"key2", *b"val2"),
        (*b"key3", *b"val3"),
        (*b"key5", *b"val5"),
    ];

    {
        let txn = env.begin_rw_txn().unwrap();
        let db = txn.open_db(None).unwrap();
        for (key, data) in &items {
            txn.put(db, key, data, WriteFlags::empty()).unwrap();
        }
        txn.commit().unwrap();
    }

    let txn = env.begin_ro_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();

    // Because Result implements FromIterator, we can collect the iterator
    // of items of type Result<_, E> into a Result<Vec<_, E>> by specifying
    // the collection type via the turbofish syntax.
    assert_eq!(items, cursor.iter().unwrap().collect::<Result<Vec<_>>>().unwrap());

    // Alternately, we can collect it into an appropriately typed variable.
    let retr: Result<Vec<_>> = cursor.iter_start().unwrap().collect();
    assert_eq!(items, retr.unwrap());

    // Iteration starts at the current item.
    cursor.set::<()>(b"key2").unwrap();
    assert_eq!(
        items.clone().into_iter().skip(1).collect::<Vec<_>>(),
        cursor.iter().unwrap().collect::<Result<Vec<_>>>().unwrap()
    );

    assert_eq!(items, cursor.iter_start().unwrap().collect::<Result<Vec<_>>>().unwrap());

    assert_eq!(
        items.clone().into_iter().skip(1).collect::<Vec<_>>(),
        cursor.iter_from(b"key2").unwrap().collect::<Result<Vec<_>>>().unwrap()
    );

    assert_eq!(
        items.clone().into_iter().skip(3).collect::<Vec<_>>(),
        cursor.iter_from(b"key4").unwrap().collect::<Result<Vec<_>>>().unwrap()
    );

    assert_eq!(
        Vec::<((), ())>::new(),
        cursor.iter_from(b"key6").unwrap().collect::<Result<Vec<_>>>().unwrap()
    );

    cursor.set::<()>(b"key3").unwrap();
    assert_eq!(
        items.into_iter().take(3).rev().collect::<Vec<_>>(),
        cursor.iter_prev().unwrap().collect::<Result<Vec<_>>>().unwrap()
    );
}

#[test]
fn test_iter_empty_database() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();
    let txn = env.begin_ro_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();

    assert!(cursor.iter::<(), ()>().unwrap().next().is_none());
    assert!(cursor.iter_prev::<(), ()>().unwrap().next().is_none());
    assert!(cursor.iter_start::<(), ()>().unwrap().next().is_none());
    assert!(cursor.iter_from::<(), ()>(b"foo").unwrap().next().is_none());
}

#[test]
fn test_iter_empty_dup_database() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();

    assert!(cursor.iter::<(), ()>().unwrap().next().is_none());
    assert!(cursor.iter_start::<(), ()>().unwrap().next().is_none());
    assert!(cursor.iter_from::<(), ()>(b"foo").unwrap().next().is_none());
    assert!(cursor.iter_dup::<(), ()>().unwrap().next().is_none());
    assert!(cursor.iter_dup_of::<()>(b"foo").unwrap().next().is_none());
}

#[test]
fn test_iter_dup() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
    txn.commit().unwrap();

    let items: Vec<([u8; 1], [u8; 1])> = [
        (b"a", b"1"),
        (b"a", b"2"),
        (b"a", b"3"),
        (b"b", b"1"),
        (b"b", b"2"),
        (b"b", b"3"),
        (b"c", b"1"),
        (b"c", b"2"),
        (b"c", b"3"),
        (b"e", b"1"),
        (b"e", b"2"),
        (b"e", b"3"),
    ]
    .iter()
    .map(|&(&k, &v)| (k, v))
    .collect();

    {
        let txn = env.begin_rw_txn().unwrap();
        for (key, data) in items.clone() {
            let db = txn.open_db(None).unwrap();
            txn.put(db, key, data, WriteFlags::empty()).unwrap();
        }
        txn.commit().unwrap();
    }

    // Reattach the key to every value.
    fn flatten(
        iter: impl Iterator<Item = Result<DupItem<[u8; 1], [u8; 1]>>>,
    ) -> Vec<([u8; 1], [u8; 1])> {
        let mut current = None;
        iter.map(|item| {
            let item = item.unwrap();
            if let Some(key) = item.key() {
                current = Some(*key);
            }
            (current.unwrap(), item.into_value())
        })
        .collect()
    }

    let txn = env.begin_ro_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();
    assert_eq!(items, flatten(cursor.iter_dup().unwrap()));

    let new_keys = cursor.iter_start::<[u8; 1], [u8; 1]>().unwrap().count();
    assert_eq!(new_keys, 12);

    cursor.set::<()>(b"b").unwrap();
    assert_eq!(items.iter().copied().skip(3).collect::<Vec<_>>(), flatten(cursor.iter_dup().unwrap()));

    let firsts: Vec<_> = cursor
        .iter_dup::<[u8; 1], [u8; 1]>()
        .unwrap()
        .map(Result::unwrap)
        .filter(DupItem::is_new_key)
        .map(|item| *item.key().unwrap())
        .collect();
    assert_eq!(firsts, [*b"a", *b"b", *b"c", *b"e"]);

    assert_eq!(
        items.iter().copied().skip(3).take(3).map(|(_, v)| v).collect::<Vec<_>>(),
        cursor.iter_dup_of::<[u8; 1]>(b"b").unwrap().collect::<Result<Vec<_>>>().unwrap()
    );

    assert_eq!(0, cursor.iter_dup_of::<()>(b"foo").unwrap().count());
}

#[test]
fn test_iter_del_get() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let items = vec![(*b"a", *b"1"), (*b"b", *b"2")];
    {
        let txn = env.begin_rw_txn().unwrap();
        let db = txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
        assert_eq!(
            txn.cursor(db)
                .unwrap()
                .iter_dup_of::<()>(b"a")
                .unwrap()
                .collect::<Result<Vec<_>>>()
                .unwrap()
                .len(),
            0
        );
        txn.commit().unwrap();
    }

    {
        let txn = env.begin_rw_txn().unwrap();
        let db = txn.open_db(None).unwrap();
        for (key, data) in &items {
            txn.put(db, key, data, WriteFlags::empty()).unwrap();
        }
        txn.commit().unwrap();
    }

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();
    assert_eq!(items, cursor.iter_start().unwrap().collect::<Result<Vec<_>>>().unwrap());

    assert_eq!(
        vec![*b"1"],
        cursor.iter_dup_of::<[u8; 1]>(b"a").unwrap().collect::<Result<Vec<_>>>().unwrap()
    );

    assert_eq!(cursor.set(b"a").unwrap(), Some(*b"1"));

    assert!(cursor.del(WriteFlags::empty()).unwrap());

    assert_eq!(
        cursor.iter_dup_of::<[u8; 1]>(b"a").unwrap().collect::<Result<Vec<_>>>().unwrap().len(),
        0
    );
}

#[test]
fn test_put_del() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();

    cursor.put(b"key1", b"val1", WriteFlags::empty()).unwrap();
    cursor.put(b"key2", b"val2", WriteFlags::empty()).unwrap();
    cursor.put(b"key3", b"val3", WriteFlags::empty()).unwrap();
    assert_eq!(cursor.key().unwrap(), b"key3".as_slice());

    assert_eq!(
        cursor.set_key(b"key2").unwrap(),
        Some((Cow::Borrowed(b"key2" as &[u8]), Cow::Borrowed(b"val2" as &[u8])))
    );
    assert_eq!(
        cursor.get_current().unwrap(),
        Some((Cow::Borrowed(b"key2" as &[u8]), Cow::Borrowed(b"val2" as &[u8])))
    );

    cursor.del(WriteFlags::empty()).unwrap();
    assert_eq!(
        cursor.get_current().unwrap(),
        Some((Cow::Borrowed(b"key3" as &[u8]), Cow::Borrowed(b"val3" as &[u8])))
    );
    assert_eq!(
        cursor.last().unwrap(),
        Some((Cow::Borrowed(b"key3" as &[u8]), Cow::Borrowed(b"val3" as &[u8])))
    );
}

#[test]
fn test_put_flags() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();

    assert!(cursor.put(b"key1", b"val1", WriteFlags::empty()).unwrap());
    assert!(!cursor.put(b"key1", b"other", WriteFlags::NO_OVERWRITE).unwrap());
    // Positioned at the item that blocked the write.
    assert_eq!(cursor.item().unwrap(), (Cow::from(b"key1".as_slice()), Cow::from(b"val1".as_slice())));

    assert!(cursor.put(b"key1", b"val2", WriteFlags::CURRENT).unwrap());
    assert_eq!(txn.get::<Vec<u8>>(db, b"key1").unwrap().unwrap(), b"val2");
    let err = cursor.put(b"key2", b"val2", WriteFlags::CURRENT).unwrap_err();
    assert!(matches!(err, KvError::KeyMismatch));

    assert!(cursor.put(b"key3", b"val3", WriteFlags::APPEND).unwrap());
    let err = cursor.put(b"key2", b"val2", WriteFlags::APPEND).unwrap_err();
    assert!(matches!(err, KvError::KeyMismatch));
    assert_eq!(collect_keys(&mut cursor), [b"key3".to_vec()]);
}

#[test]
fn test_put_current_dupsort() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
    txn.put(db, b"k", b"a", WriteFlags::empty()).unwrap();
    txn.put(db, b"k", b"c", WriteFlags::empty()).unwrap();

    let mut cursor = txn.cursor(db).unwrap();
    assert_eq!(cursor.first().unwrap(), Some((*b"k", *b"a")));
    cursor.put(b"k", b"d", WriteFlags::CURRENT).unwrap();
    assert_eq!(cursor.value().unwrap(), b"d".as_slice());
    assert_eq!(
        cursor.iter_dup_of::<[u8; 1]>(b"k").unwrap().collect::<Result<Vec<_>>>().unwrap(),
        [*b"c", *b"d"]
    );
}

#[test]
fn test_dup_sort_validation_on_non_dupsort_db() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap(); // Non-DUPSORT database
    txn.put(db, b"key1", b"val1", WriteFlags::empty()).unwrap();

    let mut cursor = txn.cursor(db).unwrap();
    cursor.first::<(), ()>().unwrap(); // Position cursor

    // These should return RequiresDupSort error
    let err = cursor.first_dup::<()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    let err = cursor.last_dup::<()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    let err = cursor.next_dup::<(), ()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    let err = cursor.prev_dup::<(), ()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    let err = cursor.get_both::<()>(b"key1", b"val1").unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    let err = cursor.get_both_range::<()>(b"key1", b"val").unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    let err = cursor.iter_dup::<(), ()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupSort)));

    // Still positioned after the failed calls.
    assert!(cursor.is_positioned());
}

#[test]
fn test_dup_fixed_validation_on_non_dupfixed_db() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    // Create DUPSORT but NOT DUPFIXED database
    let db = txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
    txn.put(db, b"key1", b"val1", WriteFlags::empty()).unwrap();

    let mut cursor = txn.cursor(db).unwrap();
    cursor.first::<(), ()>().unwrap(); // Position cursor

    let err = cursor.get_multiple::<()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupFixed)));

    let err = cursor.next_multiple::<(), ()>().unwrap_err();
    assert!(matches!(err, ReadError::Kv(KvError::RequiresDupFixed)));
}

#[test]
fn test_iter_exhausted_cursor_repositions() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    for i in 0u8..100 {
        txn.put(db, [i], [i], WriteFlags::empty()).unwrap();
    }
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    let mut cursor = txn.cursor(db).unwrap();

    // Loop 1: iterate through all items
    let count1 = cursor.iter::<[u8; 1], [u8; 1]>().unwrap().count();
    assert_eq!(count1, 100);

    // After exhaustion, is_eof should be true
    assert!(cursor.is_eof());
    assert_eq!(cursor.next::<(), ()>().unwrap(), None);

    // Loop 2: iter() should reposition and iterate all items again
    let count2 = cursor.iter::<[u8; 1], [u8; 1]>().unwrap().count();
    assert_eq!(count2, 100);

    // Turning around past the end lands on the last item.
    assert_eq!(cursor.prev().unwrap(), Some(([99u8], [99u8])));
}

#[test]
fn test_iter_benchmark_pattern() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let n = 100u32;

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.open_db(None).unwrap();
    for i in 0..n {
        let key = format!("key{i}");
        let data = format!("data{i}");
        txn.put(db, key.as_bytes(), data.as_bytes(), WriteFlags::empty()).unwrap();
    }
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let db = txn.open_db(None).unwrap();

    for _ in 0..3 {
        let mut cursor = txn.cursor(db).unwrap();
        let mut count = 0u32;

        for (key_len, data_len) in
            cursor.iter::<ObjectLength, ObjectLength>().unwrap().map(Result::unwrap)
        {
            black_box(*key_len + *data_len);
            count += 1;
        }

        for (key_len, data_len) in
            cursor.iter::<ObjectLength, ObjectLength>().unwrap().filter_map(Result::ok)
        {
            black_box(*key_len + *data_len);
            count += 1;
        }

        fn iterate(cursor: &mut Cursor<'_, Ro>) -> ReadResult<()> {
            for result in cursor.iter::<ObjectLength, ObjectLength>()? {
                let (key_len, data_len) = result?;
                black_box(*key_len + *data_len);
            }
            Ok(())
        }
        iterate(&mut cursor).unwrap();

        assert_eq!(count, n * 2);
    }
}

fn sample_env() -> (tempfile::TempDir, Environment) {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();
    let txn = env.begin_rw_txn().unwrap();
    for key in [&b"a"[..], &b"b"[..], &b"baa"[..], &b"d"[..]] {
        txn.put_default(key, b"", WriteFlags::empty()).unwrap();
    }
    txn.commit().unwrap();
    (dir, env)
}

#[test]
fn test_delete_advances() {
    let (_dir, env) = sample_env();
    let txn = env.begin_rw_txn().unwrap();
    let mut cursor = txn.cursor(txn.db()).unwrap();

    assert!(!cursor.del(WriteFlags::empty()).unwrap());

    cursor.set_key::<(), ()>(b"a").unwrap();
    for next in [&b"b"[..], &b"baa"[..], &b"d"[..]] {
        assert!(cursor.del(WriteFlags::empty()).unwrap());
        assert_eq!(cursor.key().unwrap(), next);
    }
    assert!(cursor.del(WriteFlags::empty()).unwrap());
    assert!(!cursor.is_positioned());
    assert_eq!(cursor.key().unwrap(), b"".as_slice());
    assert_eq!(cursor.item().unwrap(), (Cow::default(), Cow::default()));
    assert!(!cursor.del(WriteFlags::empty()).unwrap());
    assert!(matches!(cursor.count(), Err(KvError::Unpositioned)));

    assert!(collect_keys(&mut cursor).is_empty());
}

#[test]
fn test_empty_keys() {
    let (_dir, env) = sample_env();
    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();
    let mut cursor = txn.cursor(db).unwrap();

    assert!(matches!(txn.get::<()>(db, b""), Err(ReadError::Kv(KvError::BadValSize))));
    assert!(matches!(txn.put(db, b"", b"x", WriteFlags::empty()), Err(KvError::BadValSize)));
    assert!(matches!(cursor.put(b"", b"x", WriteFlags::empty()), Err(KvError::BadValSize)));
    assert!(matches!(cursor.set_key::<(), ()>(b""), Err(ReadError::Kv(KvError::BadValSize))));

    assert_eq!(cursor.set_range::<Vec<u8>, ()>(b"").unwrap(), Some((b"a".to_vec(), ())));
}

#[test]
fn test_iteration_symmetry() {
    let (_dir, env) = sample_env();
    let txn = env.begin_ro_txn().unwrap();
    let mut cursor = txn.cursor(txn.db()).unwrap();

    let forward = collect_keys(&mut cursor);
    assert_eq!(forward, [b"a".to_vec(), b"b".to_vec(), b"baa".to_vec(), b"d".to_vec()]);

    cursor.last::<(), ()>().unwrap();
    let backward: Vec<Vec<u8>> = cursor
        .iter_prev::<Vec<u8>, ()>()
        .unwrap()
        .map(|item| item.unwrap().0)
        .collect();
    assert_eq!(backward, forward.iter().rev().cloned().collect::<Vec<_>>());

    // Restartable from the live position.
    cursor.set::<()>(b"baa").unwrap();
    assert_eq!(collect_keys(&mut cursor), [b"baa".to_vec(), b"d".to_vec()]);
    cursor.set::<()>(b"baa").unwrap();
    assert_eq!(
        cursor.iter_prev::<Vec<u8>, ()>().unwrap().map(|item| item.unwrap().0).collect::<Vec<_>>(),
        [b"baa".to_vec(), b"b".to_vec(), b"a".to_vec()]
    );
}

#[test]
fn test_reverse_scan_large() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();
    for i in 0u32..65535 {
        txn.append(db, i.to_be_bytes(), b"").unwrap();
    }
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let mut cursor = txn.cursor(txn.db()).unwrap();
    assert_eq!(cursor.last::<[u8; 4], ()>().unwrap(), Some((65534u32.to_be_bytes(), ())));

    let mut expected = 65535u32;
    for item in cursor.iter_prev::<[u8; 4], ()>().unwrap() {
        expected -= 1;
        assert_eq!(u32::from_be_bytes(item.unwrap().0), expected);
    }
    assert_eq!(expected, 0);
}

#[test]
fn test_multi_cursor_delete() {
    let (_dir, env) = sample_env();
    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();

    let mut first = txn.cursor(db).unwrap();
    let mut second = txn.cursor(db).unwrap();
    first.set::<()>(b"b").unwrap();
    second.set::<()>(b"b").unwrap();

    assert!(first.del(WriteFlags::empty()).unwrap());
    assert_eq!(first.key().unwrap(), b"baa".as_slice());

    // The other cursor sees the deletion on its next move.
    assert_eq!(second.key().unwrap(), b"".as_slice());
    assert_eq!(second.get_current::<(), ()>().unwrap(), None);
    assert_eq!(second.next::<Vec<u8>, ()>().unwrap(), Some((b"baa".to_vec(), ())));

    second.set::<()>(b"d").unwrap();
    assert_eq!(second.prev::<Vec<u8>, ()>().unwrap(), Some((b"baa".to_vec(), ())));
}

#[test]
fn test_delete_while_iterating() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();
    for i in 0u32..20000 {
        txn.put(db, i.to_be_bytes(), i.to_le_bytes(), WriteFlags::empty()).unwrap();
    }
    txn.commit().unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();
    let mut cursor = txn.cursor(db).unwrap();
    let mut seen = 0u32;
    for item in cursor.iter_start::<[u8; 4], [u8; 4]>().unwrap() {
        let (key, value) = item.unwrap();
        assert_eq!(u32::from_be_bytes(key), seen);
        assert_eq!(u32::from_le_bytes(value), seen);
        assert!(txn.del(db, key, None).unwrap());
        seen += 1;
    }
    assert_eq!(seen, 20000);
    assert_eq!(txn.db_stat(db).unwrap().entries(), 0);
    assert_eq!(cursor.first::<(), ()>().unwrap(), None);
}

#[test]
fn test_delete_from_either_end() {
    let dir = tempdir().unwrap();
    let env = Environment::builder().open(dir.path()).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();
    for i in 0u32..20000 {
        txn.put(db, i.to_be_bytes(), b"v", WriteFlags::empty()).unwrap();
    }
    txn.commit().unwrap();

    let txn = env.begin_rw_txn().unwrap();
    let db = txn.db();
    {
        let mut cursor = txn.cursor(db).unwrap();
        let mut deleted = 0u32;
        while let Some((key, ())) = cursor.first::<[u8; 4], ()>().unwrap() {
            assert_eq!(u32::from_be_bytes(key), deleted);
            assert!(cursor.del(WriteFlags::empty()).unwrap());
            deleted += 1;
            if deleted == 10000 {
                break;
            }
        }
    }

    // The rest goes from the back, inside a nested transaction.
    let child = txn.begin_nested_txn().unwrap();
    {
        let mut cursor = child.cursor(db).unwrap();
        let mut expected = 20000u32;
        while let Some((key, ())) = cursor.last::<[u8; 4], ()>().unwrap() {
            expected -= 1;
            assert_eq!(u32::from_be_bytes(key), expected);
            assert!(cursor.del(WriteFlags::empty()).unwrap());
        }
        assert_eq!(expected, 10000);
        assert_eq!(cursor.set_range::<(), ()>(&[0]).unwrap(), None);
    }
    child.commit().unwrap();
    assert_eq!(txn.db_stat(db).unwrap().entries(), 0);
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    assert_eq!(txn.cursor(txn.db()).unwrap().first::<(), ()>().unwrap(), None);
}

#[test]
fn test_cursor_fails_after_close() {
    let (_dir, env) = sample_env();
    let txn = env.begin_ro_txn().unwrap();
    let mut cursor = txn.cursor(txn.db()).unwrap();
    let mut iter = cursor.iter::<Vec<u8>, ()>().unwrap();
    assert!(iter.next().unwrap().is_ok());

    env.close().unwrap();
    assert!(matches!(iter.next(), Some(Err(ReadError::Kv(KvError::EnvClosed)))));
    assert!(iter.next().unwrap().is_err());
}
