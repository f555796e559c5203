use crate::{KvError, ReadResult};
use std::borrow::Cow;

/// A marker trait for types that can be deserialized from a database value
/// without borrowing from the transaction.
///
/// Types implementing this trait can be used with iterators that need to
/// return owned values. This is automatically implemented for any type that
/// implements [`TableObject<'a>`] for all lifetimes `'a`.
///
/// # Built-in Implementations
///
/// - [`Vec<u8>`] - Always copies data
/// - `[u8; N]` - Copies into fixed-size array, fails on length mismatch
/// - `()` - Ignores data entirely
/// - [`ObjectLength`] - Returns only the length
pub trait TableObjectOwned: for<'de> TableObject<'de> {
    /// Decodes the object from the given bytes.
    fn decode(data: &[u8]) -> ReadResult<Self> {
        <Self as TableObject<'_>>::decode_borrow(Cow::Borrowed(data))
    }
}

impl<T> TableObjectOwned for T where T: for<'de> TableObject<'de> {}

/// Decodes values read from the database into Rust types.
///
/// The lifetime parameter `'a` is the lifetime of the transaction the bytes
/// were read from. Committed data is handed over as `Cow::Borrowed` and may
/// be kept for as long as the transaction is borrowed. Data written by the
/// reading transaction itself and not yet committed is always handed over as
/// `Cow::Owned`, since later writes in the same transaction may replace it.
///
/// Choosing the target type is how a caller picks between borrowed and
/// copied results: `Cow<'a, [u8]>` borrows where it can, [`Vec<u8>`] always
/// copies.
///
/// ```
/// # use std::borrow::Cow;
/// use signet_kvdb::{KvError, ReadResult, TableObject};
///
/// struct Hash([u8; 32]);
///
/// impl TableObject<'_> for Hash {
///     fn decode_borrow(data: Cow<'_, [u8]>) -> ReadResult<Self> {
///         let arr: [u8; 32] =
///             data.as_ref().try_into().map_err(|_| KvError::DecodeErrorLenDiff)?;
///         Ok(Self(arr))
///     }
/// }
/// ```
pub trait TableObject<'a>: Sized {
    /// Creates the object from a `Cow` of bytes.
    fn decode_borrow(data: Cow<'a, [u8]>) -> ReadResult<Self>;
}

impl<'a> TableObject<'a> for Cow<'a, [u8]> {
    #[inline]
    fn decode_borrow(data: Cow<'a, [u8]>) -> ReadResult<Self> {
        Ok(data)
    }
}

impl TableObject<'_> for Vec<u8> {
    #[inline]
    fn decode_borrow(data: Cow<'_, [u8]>) -> ReadResult<Self> {
        Ok(data.into_owned())
    }
}

impl TableObject<'_> for () {
    #[inline]
    fn decode_borrow(_: Cow<'_, [u8]>) -> ReadResult<Self> {
        Ok(())
    }
}

/// If you don't need the data itself, just its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectLength(pub usize);

impl TableObject<'_> for ObjectLength {
    fn decode_borrow(data: Cow<'_, [u8]>) -> ReadResult<Self> {
        Ok(Self(data.len()))
    }
}

impl<const LEN: usize> TableObject<'_> for [u8; LEN] {
    fn decode_borrow(data: Cow<'_, [u8]>) -> ReadResult<Self> {
        data.as_ref().try_into().map_err(|_| KvError::DecodeErrorLenDiff.into())
    }
}

impl core::ops::Deref for ObjectLength {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
