//! Public type aliases for transactions, cursors, and iterators.

use crate::{
    Ro, Rw,
    tx::{cursor::Cursor, r#impl::Tx, iter::Iter, ops::op},
};
use std::borrow::Cow;

// --- Transaction aliases ---

/// A read-only transaction.
pub type RoTx = Tx<Ro>;

/// A read-write transaction.
pub type RwTx = Tx<Rw>;

// --- Cursor aliases ---

/// A cursor in a read-only transaction.
pub type RoCursor<'tx> = Cursor<'tx, Ro>;

/// A cursor in a read-write transaction.
pub type RwCursor<'tx> = Cursor<'tx, Rw>;

// --- Iterator aliases ---

/// Iterates over KV pairs in ascending order.
pub type IterKeyVals<'tx, 'cur, K, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> =
    Iter<'tx, 'cur, K, Key, Value, { op::NEXT }>;

/// Iterates over KV pairs in descending order.
pub type IterKeyValsRev<'tx, 'cur, K, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> =
    Iter<'tx, 'cur, K, Key, Value, { op::PREV }>;

/// An iterator over the key/value pairs in a `DUPSORT` database, yielding the
/// first value for each key.
pub type IterDupKeys<'tx, 'cur, K, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> =
    Iter<'tx, 'cur, K, Key, Value, { op::NEXT_NODUP }>;

/// An iterator over the key/value pairs in a `DUPSORT` database, yielding
/// each remaining duplicate value of the current key.
pub type IterDupVals<'tx, 'cur, K, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> =
    Iter<'tx, 'cur, K, Key, Value, { op::NEXT_DUP }>;

/// A key-value iterator for a read-only transaction.
pub type RoIter<'tx, 'cur, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> =
    IterKeyVals<'tx, 'cur, Ro, Key, Value>;

/// A key-value iterator for a read-write transaction.
pub type RwIter<'tx, 'cur, Key = Cow<'tx, [u8]>, Value = Cow<'tx, [u8]>> =
    IterKeyVals<'tx, 'cur, Rw, Key, Value>;
