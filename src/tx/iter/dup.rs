//! Flat iterator for DUPSORT databases.

use crate::{
    Cursor, ReadResult, TableObject, TransactionKind,
    tx::{iter::DupItem, ops::op},
};
use std::borrow::Cow;

/// An iterator over the items of a `DUPSORT` database, yielding each key
/// once, with its first value, followed by its remaining values.
///
/// See [`Cursor::iter_dup`].
pub struct IterDup<'tx, 'cur, K: TransactionKind, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> {
    cursor: &'cur mut Cursor<'tx, K>,
    pending: Option<DupItem<Key, Value>>,
    exhausted: bool,
}

impl<K, Key, Value> core::fmt::Debug for IterDup<'_, '_, K, Key, Value>
where
    K: TransactionKind,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterDup").field("exhausted", &self.exhausted).finish()
    }
}

impl<'tx: 'cur, 'cur, K, Key, Value> IterDup<'tx, 'cur, K, Key, Value>
where
    K: TransactionKind,
{
    /// Create a new iterator that is already exhausted.
    pub(crate) const fn new_end(cursor: &'cur mut Cursor<'tx, K>) -> Self {
        IterDup { cursor, pending: None, exhausted: true }
    }

    /// Create a new iterator, first yielding the provided item as the start
    /// of a key.
    pub(crate) fn new_with(cursor: &'cur mut Cursor<'tx, K>, first: (Key, Value)) -> Self {
        IterDup { cursor, pending: Some(DupItem::NewKey(first.0, first.1)), exhausted: false }
    }
}

impl<'tx: 'cur, 'cur, K, Key, Value> IterDup<'tx, 'cur, K, Key, Value>
where
    K: TransactionKind,
    Key: TableObject<'tx>,
    Value: TableObject<'tx>,
{
    /// Fetch the next item from the iterator.
    pub fn borrow_next(&mut self) -> ReadResult<Option<DupItem<Key, Value>>> {
        if self.exhausted {
            return Ok(None);
        }
        self.cursor.txn().check_alive()?;
        if let Some(item) = self.pending.take() {
            return Ok(Some(item));
        }
        if let Some(((), value)) = self.cursor.step::<(), Value>(op::NEXT_DUP)? {
            return Ok(Some(DupItem::SameKey(value)));
        }
        match self.cursor.step::<Key, Value>(op::NEXT_NODUP)? {
            Some((key, value)) => Ok(Some(DupItem::NewKey(key, value))),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

impl<'tx: 'cur, 'cur, K, Key, Value> Iterator for IterDup<'tx, 'cur, K, Key, Value>
where
    K: TransactionKind,
    Key: TableObject<'tx>,
    Value: TableObject<'tx>,
{
    type Item = ReadResult<DupItem<Key, Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.borrow_next().transpose()
    }
}
