//! Iterator types for traversing databases.
//!
//! # Iterator Types
//!
//! | Iterator | Yields | Use Case |
//! |----------|--------|----------|
//! | [`Iter`] | `(Key, Value)` | Base iterator, configurable cursor op |
//! | [`IterDup`] | [`DupItem`] | Flat iteration over DUPSORT tables |
//! | [`IterDupOfKey`] | `Value` | Single-key DUPSORT iteration |
//!
//! All iterators are lazy and single-pass. They drive the cursor they were
//! created from, so when iteration stops the cursor is left on the last item
//! yielded, and a new iteration can be started from there. Items are decoded
//! with the transaction's lifetime: `Cow<'tx, [u8]>` borrows committed data,
//! [`Vec<u8>`] always copies.
//!
//! Iteration observes writes made through other cursors of the same
//! transaction. A deleted item is never yielded after its deletion, and
//! iteration continues from its successor.
//!
//! # Example
//!
//! ```
//! # use signet_kvdb::{Environment, WriteFlags};
//! # let dir = tempfile::tempdir().unwrap();
//! # let env = Environment::builder().open(dir.path()).unwrap();
//! let txn = env.begin_rw_txn().unwrap();
//! txn.put_default(b"a", b"1", WriteFlags::empty()).unwrap();
//! txn.put_default(b"b", b"2", WriteFlags::empty()).unwrap();
//!
//! let mut cursor = txn.cursor(txn.db()).unwrap();
//! for result in cursor.iter_start::<Vec<u8>, Vec<u8>>().unwrap() {
//!     let (key, value) = result.expect("decode error");
//!     println!("{:?} => {:?}", key, value);
//! }
//! ```

mod base;
pub use base::Iter;

mod dup;
pub use dup::IterDup;

mod dup_key;
pub use dup_key::IterDupOfKey;

/// An item from a duplicate-key iterator.
///
/// This enum avoids cloning the key for every value when iterating
/// over databases with duplicate keys. The key is only provided when
/// it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DupItem<K, V> {
    /// First value for a new key.
    NewKey(K, V),
    /// Additional value for the current key.
    SameKey(V),
}

impl<K, V> DupItem<K, V> {
    /// Returns the value, consuming self.
    pub fn into_value(self) -> V {
        match self {
            Self::NewKey(_, v) | Self::SameKey(v) => v,
        }
    }

    /// Returns a reference to the value.
    pub const fn value(&self) -> &V {
        match self {
            Self::NewKey(_, v) | Self::SameKey(v) => v,
        }
    }

    /// Returns the key if this is a new key entry.
    pub const fn key(&self) -> Option<&K> {
        match self {
            Self::NewKey(k, _) => Some(k),
            Self::SameKey(_) => None,
        }
    }

    /// Returns true if this item represents a new key.
    pub const fn is_new_key(&self) -> bool {
        matches!(self, Self::NewKey(..))
    }
}
