//! A view of data borrowed from a transaction.
//!
//! This module provides [`TxView`], a wrapper that ensures transaction validity
//! is checked before accessing borrowed data.

use crate::{KvResult, ReadResult, TableObjectOwned, TransactionKind, Tx};
use std::borrow::Cow;

/// A view of data read through a transaction.
///
/// The borrow checker already ties the data to the transaction handle. The
/// view adds a runtime check on top: once the transaction has been finished
/// through another path (its parent committed or aborted, or the environment
/// closed), accessing the data fails with an error instead of handing out
/// values the transaction no longer vouches for.
///
/// # Example
///
/// ```
/// # use signet_kvdb::{Environment, WriteFlags};
/// # let dir = tempfile::tempdir().unwrap();
/// # let env = Environment::builder().open(dir.path()).unwrap();
/// let txn = env.begin_rw_txn().unwrap();
/// txn.put_default(b"key", b"value", WriteFlags::empty()).unwrap();
///
/// let view = txn.get_view::<Vec<u8>>(txn.db(), b"key").unwrap().unwrap();
/// assert_eq!(view.try_get().unwrap(), b"value");
/// ```
pub struct TxView<'tx, K, T = Cow<'tx, [u8]>>
where
    K: TransactionKind,
{
    data: T,
    txn: &'tx Tx<K>,
}

impl<'tx, K, T> TxView<'tx, K, T>
where
    K: TransactionKind,
{
    /// Creates a new `TxView`.
    #[inline]
    pub(crate) const fn new(data: T, txn: &'tx Tx<K>) -> Self {
        Self { data, txn }
    }

    /// Checks if data view is still valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.txn.is_alive()
    }

    /// Enforce that the transaction is still valid.
    ///
    /// Fails with [`KvError::EnvClosed`] or [`KvError::TxnFinished`].
    ///
    /// [`KvError::EnvClosed`]: crate::KvError::EnvClosed
    /// [`KvError::TxnFinished`]: crate::KvError::TxnFinished
    #[inline]
    pub fn enforce_valid(&self) -> KvResult<()> {
        self.txn.check_alive()
    }

    /// Access the data after checking transaction validity.
    #[inline]
    pub fn try_get(&self) -> KvResult<&T> {
        self.enforce_valid()?;
        Ok(&self.data)
    }

    /// Access the data after checking transaction validity.
    #[inline]
    pub fn inspect<F>(&self, f: F) -> ReadResult<()>
    where
        F: FnOnce(&T),
    {
        self.enforce_valid()?;
        f(&self.data);
        Ok(())
    }

    /// Map the inner data to another type while preserving transaction access.
    #[inline]
    pub fn map<U, F>(self, f: F) -> ReadResult<TxView<'tx, K, U>>
    where
        F: FnOnce(T) -> U,
    {
        self.enforce_valid()?;
        Ok(TxView::new(f(self.data), self.txn))
    }

    /// Map the inner data to another type that may fail, while preserving
    /// transaction access.
    #[inline]
    pub fn flat_map<U, F>(self, f: F) -> ReadResult<TxView<'tx, K, U>>
    where
        F: FnOnce(T) -> ReadResult<U>,
    {
        self.enforce_valid()?;
        Ok(TxView::new(f(self.data)?, self.txn))
    }

    /// Consume the view and take ownership of the inner data, after checking
    /// transaction validity.
    #[inline]
    pub fn into_inner(self) -> KvResult<T> {
        self.enforce_valid()?;
        Ok(self.data)
    }
}

impl<K, T> TxView<'_, K, T>
where
    K: TransactionKind,
    T: TableObjectOwned,
{
    /// Take the data by value. Owned data does not depend on the
    /// transaction, so no check is needed.
    pub fn into_owned(self) -> T {
        self.data
    }
}

impl<K, T> TxView<'_, K, T>
where
    K: TransactionKind,
    T: AsRef<[u8]>,
{
    /// Returns the length of the data.
    pub fn try_len(&self) -> KvResult<usize> {
        self.enforce_valid()?;
        Ok(self.data.as_ref().len())
    }
}

impl<K, T> TxView<'_, K, T>
where
    K: TransactionKind,
    T: Clone,
{
    /// Clone the inner data after checking transaction validity.
    #[inline]
    pub fn try_clone_inner(&self) -> KvResult<T> {
        self.enforce_valid()?;
        Ok(self.data.clone())
    }
}

impl<K, T> Clone for TxView<'_, K, T>
where
    K: TransactionKind,
    T: Clone,
{
    fn clone(&self) -> Self {
        Self { data: self.data.clone(), txn: self.txn }
    }
}

impl<K, T> core::fmt::Debug for TxView<'_, K, T>
where
    K: TransactionKind,
    T: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never show data the transaction no longer vouches for.
        if self.is_valid() {
            f.debug_struct("TxView").field("data", &self.data).finish()
        } else {
            f.debug_struct("TxView").field("data", &"<closed>").finish()
        }
    }
}
