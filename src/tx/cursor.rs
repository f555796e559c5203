use crate::{
    Database, DatabaseFlags, KvError, KvResult, ReadResult, TableObject, TransactionKind, Tx,
    WriteFlags,
    tx::{
        aliases::{IterDupVals, IterKeyVals, IterKeyValsRev},
        assertions,
        iter::{Iter, IterDup, IterDupOfKey},
        kind::WriteMarker,
        layer::Edit,
        ops::{Direction, Position, PutPlan, Step, op},
    },
};
use smallvec::smallvec;
use std::{borrow::Cow, fmt};
use tracing::trace;

/// A cursor for navigating the items within a database.
///
/// A cursor does not hold on to entries. Its position is a logical key and
/// value, resolved again on every operation, so deletions made through
/// other cursors or the transaction itself are observed on the next move:
/// stepping from a deleted entry lands on its successor or predecessor.
pub struct Cursor<'tx, K>
where
    K: TransactionKind,
{
    txn: &'tx Tx<K>,
    db: Database,
    /// Current entry, if any.
    pos: Option<Position>,
    /// Moved past the end in this direction. `pos` keeps the last entry
    /// visited as an anchor.
    past: Option<Direction>,
}

impl<'tx, K> Cursor<'tx, K>
where
    K: TransactionKind,
{
    pub(crate) const fn new(txn: &'tx Tx<K>, db: Database) -> Self {
        Self { txn, db, pos: None, past: None }
    }

    /// Returns the transaction associated with this cursor.
    pub const fn txn(&self) -> &'tx Tx<K> {
        self.txn
    }

    /// Returns the database associated with this cursor.
    pub const fn db(&self) -> Database {
        self.db
    }

    /// Returns the flags of the database associated with this cursor.
    pub const fn db_flags(&self) -> DatabaseFlags {
        self.db.flags()
    }

    /// Returns `true` if the cursor is on an entry, i.e. it is neither
    /// unset nor past either end.
    ///
    /// The entry may have been deleted since the cursor moved there; see
    /// [`Cursor::get_current`].
    pub const fn is_positioned(&self) -> bool {
        self.pos.is_some() && self.past.is_none()
    }

    /// Returns `true` if the cursor is at EOF or not positioned.
    pub const fn is_eof(&self) -> bool {
        !self.is_positioned()
    }

    /// Validates that the database has the DUP_SORT flag set.
    #[inline(always)]
    fn require_dup_sort(&self, flags: DatabaseFlags) -> KvResult<()> {
        flags.contains(DatabaseFlags::DUP_SORT).then_some(()).ok_or(KvError::RequiresDupSort)
    }

    /// Runs a cursor operation without moving the cursor.
    fn peek(&self, key: Option<&[u8]>, data: Option<&[u8]>, op: u32) -> KvResult<Option<Step<'tx>>> {
        let dbi = self.db.dbi();
        let pos = self.pos.as_ref();
        self.txn.with_view(|view| {
            // Past an end, the anchor is only reachable by turning around.
            if let Some(past) = self.past {
                let turn = match (past, op) {
                    (Direction::Forward, op::PREV | op::PREV_NODUP) => op::PREV,
                    (Direction::Backward, op::NEXT | op::NEXT_NODUP) => op::NEXT,
                    (_, op::GET_CURRENT) => return Ok(None),
                    _ => 0,
                };
                if turn != 0 {
                    let flags = view.require_db(dbi)?.flags;
                    return match view.cursor_get(dbi, flags, pos, None, None, op::GET_CURRENT)? {
                        Some(step) => Ok(Some(step)),
                        None => view.cursor_get(dbi, flags, pos, None, None, turn),
                    };
                }
            }
            let flags = view.require_db(dbi)?.flags;
            match op {
                op::FIRST_DUP
                | op::LAST_DUP
                | op::NEXT_DUP
                | op::PREV_DUP
                | op::GET_BOTH
                | op::GET_BOTH_RANGE => self.require_dup_sort(flags)?,
                op::GET_MULTIPLE | op::NEXT_MULTIPLE => {
                    if !flags.contains(DatabaseFlags::DUP_FIXED) {
                        return Err(KvError::RequiresDupFixed);
                    }
                }
                _ => {}
            }
            view.cursor_get(dbi, flags, pos, key, data, op)
        })?
    }

    /// Runs a cursor operation and moves the cursor to its result.
    ///
    /// Misses on absolute positioning leave the cursor unset. Misses on
    /// relative moves keep the cursor where it was: moving past either end
    /// marks it as EOF, and duplicate moves within a key stay on the key.
    fn get<Key, Value>(
        &mut self,
        key: Option<&[u8]>,
        data: Option<&[u8]>,
        op: u32,
    ) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        match self.peek(key, data, op)? {
            Some(step) => {
                self.pos = Some(step.position);
                self.past = None;
                Ok(Some((Key::decode_borrow(step.key)?, Value::decode_borrow(step.value)?)))
            }
            None => {
                match op {
                    op::FIRST
                    | op::LAST
                    | op::SET
                    | op::SET_KEY
                    | op::SET_RANGE
                    | op::GET_BOTH
                    | op::GET_BOTH_RANGE => {
                        self.pos = None;
                        self.past = None;
                    }
                    op::NEXT | op::NEXT_NODUP if self.pos.is_some() => {
                        self.past = Some(Direction::Forward);
                    }
                    op::PREV | op::PREV_NODUP if self.pos.is_some() => {
                        self.past = Some(Direction::Backward);
                    }
                    _ => {}
                }
                Ok(None)
            }
        }
    }

    /// Runs a cursor operation for an iterator.
    pub(crate) fn step<Key, Value>(&mut self, op: u32) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op)
    }

    fn get_value<Value>(
        &mut self,
        key: Option<&[u8]>,
        data: Option<&[u8]>,
        op: u32,
    ) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        Ok(self.get::<(), Value>(key, data, op)?.map(|(_, value)| value))
    }

    /// Position at first key/data item.
    pub fn first<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::FIRST)
    }

    /// [`DatabaseFlags::DUP_SORT`]-only: Position at first data item of current key.
    ///
    /// Returns [`KvError::RequiresDupSort`] if the database does not have the
    /// [`DatabaseFlags::DUP_SORT`] flag set.
    pub fn first_dup<Value>(&mut self) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get_value(None, None, op::FIRST_DUP)
    }

    /// [`DatabaseFlags::DUP_SORT`]-only: Position at key/data pair.
    pub fn get_both<Value>(&mut self, k: &[u8], v: &[u8]) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get_value(Some(k), Some(v), op::GET_BOTH)
    }

    /// [`DatabaseFlags::DUP_SORT`]-only: Position at given key and at first data greater than or
    /// equal to specified data.
    pub fn get_both_range<Value>(&mut self, k: &[u8], v: &[u8]) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get_value(Some(k), Some(v), op::GET_BOTH_RANGE)
    }

    /// Return key/data at current cursor position.
    ///
    /// Returns `None` if the cursor is unset, past either end, or its entry
    /// has been deleted.
    pub fn get_current<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::GET_CURRENT)
    }

    /// [`DatabaseFlags::DUP_FIXED`]-only: Return all duplicate data items of
    /// the current key, concatenated. Moves the cursor to the last of them.
    ///
    /// Returns [`KvError::RequiresDupFixed`] if the database does not have the
    /// [`DatabaseFlags::DUP_FIXED`] flag set.
    pub fn get_multiple<Value>(&mut self) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get_value(None, None, op::GET_MULTIPLE)
    }

    /// Position at last key/data item.
    pub fn last<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::LAST)
    }

    /// [`DatabaseFlags::DUP_SORT`]-only: Position at last data item of current key.
    pub fn last_dup<Value>(&mut self) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get_value(None, None, op::LAST_DUP)
    }

    /// Position at next data item.
    ///
    /// From an unset cursor this is [`Cursor::first`].
    #[expect(clippy::should_implement_trait)]
    pub fn next<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::NEXT)
    }

    /// [`DatabaseFlags::DUP_SORT`]-only: Position at next data item of current key.
    pub fn next_dup<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::NEXT_DUP)
    }

    /// [`DatabaseFlags::DUP_FIXED`]-only: Return the duplicate data items
    /// after the current one, concatenated.
    pub fn next_multiple<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::NEXT_MULTIPLE)
    }

    /// Position at first data item of next key.
    pub fn next_nodup<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::NEXT_NODUP)
    }

    /// Position at previous data item.
    ///
    /// From an unset cursor this is [`Cursor::last`].
    pub fn prev<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::PREV)
    }

    /// [`DatabaseFlags::DUP_SORT`]-only: Position at previous data item of current key.
    pub fn prev_dup<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::PREV_DUP)
    }

    /// Position at last data item of previous key.
    pub fn prev_nodup<Key, Value>(&mut self) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(None, None, op::PREV_NODUP)
    }

    /// Position at specified key.
    ///
    /// Fails with [`KvError::BadValSize`] if the key is empty.
    pub fn set<Value>(&mut self, key: &[u8]) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get_value(Some(key), None, op::SET)
    }

    /// Position at specified key, return both key and data.
    ///
    /// Fails with [`KvError::BadValSize`] if the key is empty.
    pub fn set_key<Key, Value>(&mut self, key: &[u8]) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(Some(key), None, op::SET_KEY)
    }

    /// Position at first key greater than or equal to specified key.
    ///
    /// An empty key positions at the first item.
    pub fn set_range<Key, Value>(&mut self, key: &[u8]) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.get(Some(key), None, op::SET_RANGE)
    }

    /// The key at the current position, or an empty key if there is none.
    pub fn key(&self) -> KvResult<Cow<'tx, [u8]>> {
        Ok(self.peek(None, None, op::GET_CURRENT)?.map(|step| step.key).unwrap_or_default())
    }

    /// The value at the current position, or an empty value if there is
    /// none.
    pub fn value(&self) -> KvResult<Cow<'tx, [u8]>> {
        Ok(self.peek(None, None, op::GET_CURRENT)?.map(|step| step.value).unwrap_or_default())
    }

    /// The key/value pair at the current position, or an empty pair if there
    /// is none.
    pub fn item(&self) -> KvResult<(Cow<'tx, [u8]>, Cow<'tx, [u8]>)> {
        Ok(self
            .peek(None, None, op::GET_CURRENT)?
            .map(|step| (step.key, step.value))
            .unwrap_or_default())
    }

    /// Number of values stored under the current key: the number of
    /// duplicates for [`DatabaseFlags::DUP_SORT`] databases, otherwise 1.
    ///
    /// Fails with [`KvError::Unpositioned`] if the cursor is not on an
    /// entry. Returns 0 if the current key has been deleted.
    pub fn count(&self) -> KvResult<usize> {
        let Some(pos) = self.pos.as_ref().filter(|_| self.past.is_none()) else {
            return Err(KvError::Unpositioned);
        };
        let dbi = self.db.dbi();
        self.txn.with_view(|view| {
            view.require_db(dbi)?;
            Ok(view.lookup(dbi, &pos.key).map_or(0, |found| found.dups().len()))
        })?
    }

    /// Moves to the item the iteration starting here yields first: the
    /// current entry if it is still live, otherwise its neighbour in
    /// `forward` direction. Unset and EOF cursors start from the first (or
    /// last) item.
    fn start<Key, Value>(&mut self, forward: bool) -> ReadResult<Option<(Key, Value)>>
    where
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        if !self.is_positioned() {
            return if forward { self.first() } else { self.last() };
        }
        if let Some(item) = self.get_current()? {
            return Ok(Some(item));
        }
        if forward { self.next() } else { self.prev() }
    }

    /// Returns an iterator over database items in ascending order, starting
    /// at the current item.
    ///
    /// If the current item was deleted, iteration starts at its successor.
    /// If the cursor is at EOF or not positioned (e.g., after exhausting a
    /// previous iteration), it will be repositioned to the first item.
    ///
    /// For databases with duplicate data items ([`DatabaseFlags::DUP_SORT`]),
    /// the duplicate data items of each key will be returned before moving on
    /// to the next key.
    pub fn iter<'cur, Key, Value>(
        &'cur mut self,
    ) -> ReadResult<IterKeyVals<'tx, 'cur, K, Key, Value>>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        match self.start(true)? {
            Some(first) => Ok(Iter::new_with(self, first)),
            None => Ok(Iter::new_end(self)),
        }
    }

    /// Alias of [`Cursor::iter`].
    pub fn iter_next<'cur, Key, Value>(
        &'cur mut self,
    ) -> ReadResult<IterKeyVals<'tx, 'cur, K, Key, Value>>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        self.iter()
    }

    /// Returns an iterator over database items in descending order, starting
    /// at the current item.
    ///
    /// If the current item was deleted, iteration starts at its
    /// predecessor. Unset and EOF cursors start from the last item.
    pub fn iter_prev<'cur, Key, Value>(
        &'cur mut self,
    ) -> ReadResult<IterKeyValsRev<'tx, 'cur, K, Key, Value>>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        match self.start(false)? {
            Some(first) => Ok(Iter::new_with(self, first)),
            None => Ok(Iter::new_end(self)),
        }
    }

    /// Returns an iterator over the keys of database items in ascending
    /// order, starting at the current item like [`Cursor::iter`].
    pub fn iter_keys<'cur, Key>(
        &'cur mut self,
    ) -> ReadResult<impl Iterator<Item = ReadResult<Key>> + 'cur>
    where
        'tx: 'cur,
        Key: TableObject<'tx> + 'cur,
    {
        Ok(self.iter::<Key, ()>()?.map(|item| item.map(|(key, ())| key)))
    }

    /// Iterate over database items starting from the beginning of the database.
    pub fn iter_start<'cur, Key, Value>(
        &'cur mut self,
    ) -> ReadResult<IterKeyVals<'tx, 'cur, K, Key, Value>>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        let Some(first) = self.first()? else {
            return Ok(Iter::new_end(self));
        };
        Ok(Iter::new_with(self, first))
    }

    /// Iterate over database items starting from the given key.
    pub fn iter_from<'cur, Key, Value>(
        &'cur mut self,
        key: &[u8],
    ) -> ReadResult<IterKeyVals<'tx, 'cur, K, Key, Value>>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        let Some(first) = self.set_range(key)? else {
            return Ok(Iter::new_end(self));
        };
        Ok(Iter::new_with(self, first))
    }

    /// Iterate over the items of a [`DatabaseFlags::DUP_SORT`] database,
    /// grouped by key.
    ///
    /// Starts at the current item like [`Cursor::iter`]. The first value of
    /// each key is yielded with its key as [`DupItem::NewKey`], the
    /// remaining values as [`DupItem::SameKey`].
    ///
    /// [`DupItem::NewKey`]: crate::tx::iter::DupItem::NewKey
    /// [`DupItem::SameKey`]: crate::tx::iter::DupItem::SameKey
    pub fn iter_dup<'cur, Key, Value>(
        &'cur mut self,
    ) -> ReadResult<IterDup<'tx, 'cur, K, Key, Value>>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        let flags = self.txn.db_flags(self.db)?;
        self.require_dup_sort(flags)?;
        match self.start(true)? {
            Some(first) => Ok(IterDup::new_with(self, first)),
            None => Ok(IterDup::new_end(self)),
        }
    }

    /// Iterate over the duplicates of the item in the database with the given
    /// key.
    pub fn iter_dup_of<'cur, Value>(
        &'cur mut self,
        key: &[u8],
    ) -> ReadResult<IterDupOfKey<'tx, 'cur, K, Value>>
    where
        'tx: 'cur,
        Value: TableObject<'tx>,
    {
        let flags = self.txn.db_flags(self.db)?;
        self.require_dup_sort(flags)?;
        let Some(first) = self.set(key)? else {
            return Ok(IterDupOfKey::new_end(self));
        };
        Ok(IterDupOfKey::new_with(self, first))
    }

    /// Iterate over the remaining duplicates of the current key, starting
    /// with the next one.
    pub fn iter_dup_vals<'cur, Key, Value>(
        &'cur mut self,
    ) -> IterDupVals<'tx, 'cur, K, Key, Value>
    where
        'tx: 'cur,
        Key: TableObject<'tx>,
        Value: TableObject<'tx>,
    {
        Iter::new(self)
    }
}

impl<'tx, K> Cursor<'tx, K>
where
    K: TransactionKind + WriteMarker,
{
    /// Puts a key/data pair into the database. The cursor will be positioned
    /// at the new data item, or at the existing item that prevented the
    /// write.
    ///
    /// With [`WriteFlags::CURRENT`] the item at the current position is
    /// replaced; `key` must equal the current key, otherwise this fails with
    /// [`KvError::KeyMismatch`]. Other flags behave as in [`Tx::put`].
    pub fn put(&mut self, key: &[u8], data: &[u8], flags: WriteFlags) -> KvResult<bool> {
        let max = self.txn.env().max_key_size();
        assertions::check_key(max, key)?;
        let dbi = self.db.dbi();
        let current = self.pos.as_ref().filter(|_| self.past.is_none());

        let (written, position) = self.txn.write(|view| {
            let db_flags = view.require_db(dbi)?.flags;
            assertions::check_value(max, db_flags, data)?;

            if flags.contains(WriteFlags::CURRENT) {
                let pos = current.ok_or(KvError::Unpositioned)?;
                if pos.key != key {
                    return Err(KvError::KeyMismatch);
                }
                let found = view.lookup(dbi, key).ok_or(KvError::Unpositioned)?;
                let mut dups = found.to_dups();
                if db_flags.contains(DatabaseFlags::DUP_SORT) {
                    if db_flags.contains(DatabaseFlags::DUP_FIXED) && pos.value.len() != data.len()
                    {
                        return Err(KvError::BadValSize);
                    }
                    dups.retain(|v| *v != pos.value);
                    let idx = dups.partition_point(|v| v.as_slice() < data);
                    if dups.get(idx).is_none_or(|v| v != data) {
                        dups.insert(idx, data.to_vec());
                    }
                } else {
                    dups = smallvec![data.to_vec()];
                }
                let position = Position { key: key.to_vec(), value: data.to_vec() };
                let edit = Edit::Put { dbi, key: key.to_vec(), dups: Some(dups) };
                return Ok((smallvec![edit], (true, position)));
            }

            let position = Position { key: key.to_vec(), value: data.to_vec() };
            Ok(match view.plan_put(dbi, db_flags, key, data, flags)? {
                PutPlan::Exists(existing) => (smallvec![], (false, existing)),
                PutPlan::Unchanged => (smallvec![], (true, position)),
                PutPlan::Write(dups) => {
                    let edit = Edit::Put { dbi, key: key.to_vec(), dups: Some(dups) };
                    (smallvec![edit], (true, position))
                }
            })
        })?;

        self.pos = Some(position);
        self.past = None;
        Ok(written)
    }

    /// Deletes the current key/data pair and moves to the next item.
    ///
    /// Returns `false` if the cursor is not on an entry or the entry no
    /// longer exists. For [`DatabaseFlags::DUP_SORT`] databases only the
    /// current value is removed, unless [`WriteFlags::NO_DUP_DATA`] is given
    /// to remove every value of the key.
    ///
    /// Afterwards the cursor is on the next value of the same key, or the
    /// first value of the next key, or unset if nothing follows.
    pub fn del(&mut self, flags: WriteFlags) -> KvResult<bool> {
        let Some(pos) = self.pos.clone().filter(|_| self.past.is_none()) else {
            return Ok(false);
        };
        let dbi = self.db.dbi();

        let deleted = self.txn.write(|view| {
            let db_flags = view.require_db(dbi)?.flags;
            let Some(found) = view.lookup(dbi, &pos.key) else {
                return Ok((smallvec![], false));
            };
            let all = !db_flags.contains(DatabaseFlags::DUP_SORT)
                || flags.contains(WriteFlags::NO_DUP_DATA);
            let dups = if all {
                None
            } else {
                let mut dups = found.to_dups();
                let Ok(idx) = dups.binary_search(&pos.value) else {
                    return Ok((smallvec![], false));
                };
                dups.remove(idx);
                (!dups.is_empty()).then_some(dups)
            };
            Ok((smallvec![Edit::Put { dbi, key: pos.key.clone(), dups }], true))
        })?;
        if !deleted {
            return Ok(false);
        }

        // The deleted entry is the anchor, so NEXT lands on its successor.
        if self.get::<(), ()>(None, None, op::NEXT).map_err(read_to_kv)?.is_none() {
            self.pos = None;
            self.past = None;
        }
        trace!(target: "kvdb", repositioned = self.pos.is_some(), "cursor delete");
        Ok(true)
    }
}

/// `()` never fails to decode, so only engine errors reach here.
fn read_to_kv(err: crate::ReadError) -> KvError {
    match err {
        crate::ReadError::Kv(err) => err,
        crate::ReadError::Decode(_) => KvError::DecodeErrorLenDiff,
    }
}

impl<K> Clone for Cursor<'_, K>
where
    K: TransactionKind,
{
    fn clone(&self) -> Self {
        Self { txn: self.txn, db: self.db, pos: self.pos.clone(), past: self.past }
    }
}

impl<K> fmt::Debug for Cursor<'_, K>
where
    K: TransactionKind,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("db", &self.db)
            .field("positioned", &self.is_positioned())
            .finish_non_exhaustive()
    }
}
