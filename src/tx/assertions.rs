//! Key and value size checks.
//!
//! Keys must be non-empty and no longer than
//! [`Environment::max_key_size`]. Values of [`DatabaseFlags::DUP_SORT`]
//! databases are stored as keys of the duplicate list and share the limit.
//! Other values are bounded only by the map size.
//!
//! [`Environment::max_key_size`]: crate::Environment::max_key_size

use crate::{DatabaseFlags, KvError, KvResult};

/// Validates a key against the size limit.
#[inline]
pub(crate) const fn check_key(max_key_size: usize, key: &[u8]) -> KvResult<()> {
    if key.is_empty() || key.len() > max_key_size {
        return Err(KvError::BadValSize);
    }
    Ok(())
}

/// Validates a value against the size limit for a database with `flags`.
#[inline]
pub(crate) const fn check_value(
    max_key_size: usize,
    flags: DatabaseFlags,
    value: &[u8],
) -> KvResult<()> {
    if flags.contains(DatabaseFlags::DUP_SORT) && value.len() > max_key_size {
        return Err(KvError::BadValSize);
    }
    Ok(())
}
