//! Single-key iterator for DUPSORT databases.

use crate::{Cursor, ReadResult, TableObject, TransactionKind, tx::ops::op};
use std::marker::PhantomData;

/// A single-key iterator for DUPSORT databases, yielding just values.
///
/// Unlike [`IterDup`](super::IterDup) which iterates across all keys, this
/// iterator only yields values for a single key. When all values for that
/// key are exhausted, iteration stops.
///
/// # Example
///
/// ```
/// # use signet_kvdb::{Environment, DatabaseFlags, WriteFlags};
/// # let dir = tempfile::tempdir().unwrap();
/// # let env = Environment::builder().open(dir.path()).unwrap();
/// let txn = env.begin_rw_txn().unwrap();
/// let db = txn.create_db(None, DatabaseFlags::DUP_SORT).unwrap();
///
/// txn.put(db, b"key", b"val1", WriteFlags::empty()).unwrap();
/// txn.put(db, b"key", b"val2", WriteFlags::empty()).unwrap();
/// txn.put(db, b"other", b"val3", WriteFlags::empty()).unwrap();
///
/// let mut cursor = txn.cursor(db).unwrap();
/// let values: Vec<Vec<u8>> =
///     cursor.iter_dup_of(b"key").unwrap().collect::<Result<_, _>>().unwrap();
/// assert_eq!(values, [b"val1".to_vec(), b"val2".to_vec()]);
/// ```
pub struct IterDupOfKey<'tx, 'cur, K: TransactionKind, Value = std::borrow::Cow<'tx, [u8]>> {
    cursor: &'cur mut Cursor<'tx, K>,
    /// Value found while positioning the cursor, yielded first.
    pending: Option<Value>,
    /// When true, the iterator is exhausted and will always return `None`.
    exhausted: bool,
    _marker: PhantomData<fn() -> Value>,
}

impl<K, Value> core::fmt::Debug for IterDupOfKey<'_, '_, K, Value>
where
    K: TransactionKind,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterDupOfKey").field("exhausted", &self.exhausted).finish()
    }
}

impl<'tx: 'cur, 'cur, K, Value> IterDupOfKey<'tx, 'cur, K, Value>
where
    K: TransactionKind,
{
    /// Create a new iterator that is already exhausted.
    ///
    /// Iteration will immediately return `None`.
    pub(crate) const fn new_end(cursor: &'cur mut Cursor<'tx, K>) -> Self {
        IterDupOfKey { cursor, pending: None, exhausted: true, _marker: PhantomData }
    }

    /// Create a new iterator with the provided first value.
    pub(crate) const fn new_with(cursor: &'cur mut Cursor<'tx, K>, first: Value) -> Self {
        IterDupOfKey { cursor, pending: Some(first), exhausted: false, _marker: PhantomData }
    }
}

impl<'tx: 'cur, 'cur, K, Value> IterDupOfKey<'tx, 'cur, K, Value>
where
    K: TransactionKind,
    Value: TableObject<'tx>,
{
    /// Fetch the next value from the iterator.
    ///
    /// Returns `Ok(Some(value))` if a value was found,
    /// `Ok(None)` if no more values are available for this key, or `Err` if
    /// the transaction has ended or the data cannot be decoded.
    pub fn borrow_next(&mut self) -> ReadResult<Option<Value>> {
        if self.exhausted {
            return Ok(None);
        }
        self.cursor.txn().check_alive()?;
        if let Some(v) = self.pending.take() {
            return Ok(Some(v));
        }
        let result = self.cursor.step::<(), Value>(op::NEXT_DUP)?.map(|((), value)| value);
        if result.is_none() {
            self.exhausted = true;
        }
        Ok(result)
    }
}

impl<'tx: 'cur, 'cur, K, Value> Iterator for IterDupOfKey<'tx, 'cur, K, Value>
where
    K: TransactionKind,
    Value: TableObject<'tx>,
{
    type Item = ReadResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.borrow_next().transpose()
    }
}
