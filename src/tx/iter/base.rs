//! Base iterator implementation for cursors.

use crate::{Cursor, ReadResult, TableObject, TransactionKind, tx::ops::op};
use std::{borrow::Cow, marker::PhantomData};

/// An iterator over the key/value pairs in a database.
///
/// The iteration order is determined by the `OP` const generic parameter,
/// one of the cursor operations in [`op`](crate::tx::ops::op).
///
/// Items are decoded with the transaction's lifetime, so `Cow<'tx, [u8]>`
/// items borrow committed data and outlive the iterator. Every step checks
/// that the transaction is still alive; once it is not, iteration yields an
/// error instead of data.
pub struct Iter<
    'tx,
    'cur,
    K: TransactionKind,
    Key = Cow<'tx, [u8]>,
    Value = Cow<'tx, [u8]>,
    const OP: u32 = { op::NEXT },
> {
    cursor: &'cur mut Cursor<'tx, K>,
    /// Item found while positioning the cursor, yielded first.
    pending: Option<(Key, Value)>,
    /// When true, the iterator is exhausted and will always return `None`.
    exhausted: bool,
    _marker: PhantomData<fn() -> (Key, Value)>,
}

impl<K, Key, Value, const OP: u32> core::fmt::Debug for Iter<'_, '_, K, Key, Value, OP>
where
    K: TransactionKind,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iter").field("op", &OP).field("exhausted", &self.exhausted).finish()
    }
}

impl<'tx: 'cur, 'cur, K, Key, Value, const OP: u32> Iter<'tx, 'cur, K, Key, Value, OP>
where
    K: TransactionKind,
{
    /// Create a new iterator from a mutable reference to the given cursor.
    pub(crate) const fn new(cursor: &'cur mut Cursor<'tx, K>) -> Self {
        Iter { cursor, pending: None, exhausted: false, _marker: PhantomData }
    }

    /// Create a new iterator that is already exhausted.
    ///
    /// Iteration will immediately return `None`.
    pub(crate) const fn new_end(cursor: &'cur mut Cursor<'tx, K>) -> Self {
        Iter { cursor, pending: None, exhausted: true, _marker: PhantomData }
    }

    /// Create a new iterator from a mutable reference to the given cursor,
    /// first yielding the provided key/value pair.
    pub(crate) const fn new_with(cursor: &'cur mut Cursor<'tx, K>, first: (Key, Value)) -> Self {
        Iter { cursor, pending: Some(first), exhausted: false, _marker: PhantomData }
    }
}

impl<'tx: 'cur, 'cur, K, Key, Value, const OP: u32> Iter<'tx, 'cur, K, Key, Value, OP>
where
    K: TransactionKind,
    Key: TableObject<'tx>,
    Value: TableObject<'tx>,
{
    /// Fetch the next key/value pair from the iterator.
    ///
    /// Returns `Ok(Some((key, value)))` if a key/value pair was found,
    /// `Ok(None)` if no more key/value pairs are available, or `Err` if the
    /// transaction has ended or the data cannot be decoded.
    pub fn borrow_next(&mut self) -> ReadResult<Option<(Key, Value)>> {
        if self.exhausted {
            return Ok(None);
        }
        self.cursor.txn().check_alive()?;
        if let Some(v) = self.pending.take() {
            return Ok(Some(v));
        }
        let result = self.cursor.step(OP)?;
        if result.is_none() {
            self.exhausted = true;
        }
        Ok(result)
    }
}

impl<'tx: 'cur, 'cur, K, Key, Value, const OP: u32> Iterator for Iter<'tx, 'cur, K, Key, Value, OP>
where
    K: TransactionKind,
    Key: TableObject<'tx>,
    Value: TableObject<'tx>,
{
    type Item = ReadResult<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.borrow_next().transpose()
    }
}
