mod private {
    pub trait Sealed {}
    impl Sealed for super::Ro {}
    impl Sealed for super::Rw {}
}

/// Marker type for read-only transactions.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct Ro;

/// Marker type for read-write transactions.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct Rw;

/// Marker trait for transaction kinds.
///
/// Operations that mutate are only available on kinds implementing
/// [`WriteMarker`], so writing through a read-only transaction, or nesting
/// one, is rejected at compile time.
pub trait TransactionKind: private::Sealed + core::fmt::Debug + Send + Sync + 'static {
    /// True for [`Ro`].
    const IS_READ_ONLY: bool;

    /// Create a new tracing span for this transaction kind.
    #[doc(hidden)]
    fn new_span(txn_id: u64) -> tracing::Span {
        tracing::debug_span!(
            target: "kvdb",
            "txn",
            kind = %if Self::IS_READ_ONLY { "ro" } else { "rw" },
            txn_id = txn_id,
        )
    }
}

impl TransactionKind for Ro {
    const IS_READ_ONLY: bool = true;
}

impl TransactionKind for Rw {
    const IS_READ_ONLY: bool = false;
}

/// Marker trait for writable transaction kinds.
///
/// Primarily used for writing bounds of the form
/// `K: TransactionKind + WriteMarker`.
pub trait WriteMarker: TransactionKind {}

impl WriteMarker for Rw {}
