use std::{io, sync::Arc};

/// An error returned by the key-value engine.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum KvError {
    /// An I/O error from the backing store.
    #[error("i/o error: {0}")]
    Io(Arc<io::Error>),
    /// The environment configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The backing store failed validation.
    #[error("database file is corrupted")]
    Corrupted,
    /// The data file has reached the configured map size.
    #[error("environment map size limit reached")]
    MapFull,
    /// No more named databases may be created.
    #[error("environment maximum number of named databases reached")]
    DbsFull,
    /// No more read transactions may be started.
    #[error("environment maximum number of readers reached")]
    ReadersFull,
    /// A mutation was attempted in a read-only context.
    #[error("attempted to mutate through a read-only transaction or environment")]
    Readonly,
    /// A key or value was empty or exceeded the size limits.
    #[error("invalid key or value size")]
    BadValSize,
    /// The database handle refers to a dropped database.
    #[error("database handle is invalid or the database was dropped")]
    BadDbi,
    /// The database exists with incompatible flags.
    #[error("database flags are incompatible with the existing database")]
    Incompatible,
    /// The transaction cannot be used in its current state.
    #[error("transaction is not usable, it has an active child")]
    BadTxn,
    /// The named database does not exist.
    #[error("no matching database found")]
    NotFound,
    /// An append operation violated key ordering.
    #[error("key or value is out of order for an append operation")]
    KeyMismatch,
    /// The cursor is not positioned.
    #[error("cursor is not positioned on an entry")]
    Unpositioned,
    /// The operation requires a [`DUP_SORT`] database.
    ///
    /// [`DUP_SORT`]: crate::DatabaseFlags::DUP_SORT
    #[error("operation requires a DUP_SORT database")]
    RequiresDupSort,
    /// The operation requires a [`DUP_FIXED`] database.
    ///
    /// [`DUP_FIXED`]: crate::DatabaseFlags::DUP_FIXED
    #[error("operation requires a DUP_FIXED database")]
    RequiresDupFixed,
    /// The environment has been closed.
    #[error("environment is closed")]
    EnvClosed,
    /// The transaction has already been committed or aborted.
    #[error("transaction has already been committed or aborted")]
    TxnFinished,
    /// Another write transaction is active.
    ///
    /// An admission violation, classified as
    /// [`ErrorKind::InvalidParameter`].
    #[error("another write transaction is active")]
    Busy,
    /// The data file is locked by another environment.
    #[error("data file is locked by another environment")]
    Locked,
    /// A fixed-size decode received data of the wrong length.
    #[error("decoded data has an unexpected length")]
    DecodeErrorLenDiff,
}

/// Coarse classification of a [`KvError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid open-time configuration.
    Config,
    /// Filesystem failure.
    Io,
    /// Mutation attempted on a read-only transaction or environment.
    Readonly,
    /// Structurally invalid call, including a refused writer admission.
    InvalidParameter,
    /// Empty or oversized key or value.
    BadValsize,
    /// Use of a handle after its terminal event.
    ClosedHandle,
    /// A named database was not found.
    NotFound,
    /// A configured limit was reached.
    Capacity,
    /// The store failed validation.
    Corrupted,
    /// A value could not be decoded.
    Decode,
}

impl KvError {
    /// Returns the [`ErrorKind`] of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Locked => ErrorKind::Io,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Corrupted => ErrorKind::Corrupted,
            Self::MapFull | Self::DbsFull | Self::ReadersFull => ErrorKind::Capacity,
            Self::Readonly => ErrorKind::Readonly,
            Self::BadValSize => ErrorKind::BadValsize,
            Self::BadDbi
            | Self::Incompatible
            | Self::BadTxn
            | Self::KeyMismatch
            | Self::Unpositioned
            | Self::RequiresDupSort
            | Self::RequiresDupFixed
            | Self::Busy => ErrorKind::InvalidParameter,
            Self::NotFound => ErrorKind::NotFound,
            Self::EnvClosed | Self::TxnFinished => ErrorKind::ClosedHandle,
            Self::DecodeErrorLenDiff => ErrorKind::Decode,
        }
    }

    /// True if the error is an [`ErrorKind::ClosedHandle`] error.
    pub const fn is_closed_handle(&self) -> bool {
        matches!(self.kind(), ErrorKind::ClosedHandle)
    }
}

impl From<io::Error> for KvError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// An error returned when reading and decoding data.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The engine returned an error.
    #[error(transparent)]
    Kv(#[from] KvError),
    /// The value could not be decoded.
    #[error("failed to decode value: {0}")]
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

impl ReadError {
    /// Creates a decode error from any error type.
    pub fn decode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decode(Box::new(err))
    }

    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Kv(err) => err.kind(),
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Returns the engine error, if this is one.
    pub const fn as_kv(&self) -> Option<&KvError> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Decode(_) => None,
        }
    }
}

/// Engine result type.
pub type KvResult<T> = Result<T, KvError>;

/// Read result type.
pub type ReadResult<T> = Result<T, ReadError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(KvError::BadValSize.kind(), ErrorKind::BadValsize);
        assert_eq!(KvError::BadDbi.kind(), ErrorKind::InvalidParameter);
        assert_eq!(KvError::TxnFinished.kind(), ErrorKind::ClosedHandle);
        assert!(KvError::EnvClosed.is_closed_handle());
        assert_eq!(KvError::InvalidConfig("x".into()).kind(), ErrorKind::Config);
        assert_eq!(KvError::Busy.kind(), ErrorKind::InvalidParameter);
        assert_eq!(KvError::Locked.kind(), ErrorKind::Io);

        let err: ReadError = KvError::Readonly.into();
        assert_eq!(err.kind(), ErrorKind::Readonly);
        assert!(matches!(err.as_kv(), Some(KvError::Readonly)));
    }

    #[test]
    fn io_errors_are_cloneable() {
        let err: KvError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        let cloned = err.clone();
        assert_eq!(cloned.kind(), ErrorKind::Io);
        assert!(cloned.to_string().contains("gone"));
    }
}
