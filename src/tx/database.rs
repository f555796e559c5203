use crate::{DatabaseFlags, sys::storage::Dbi};

/// A handle to an individual database in an environment.
///
/// Handles are plain values: copying them is free, and a handle obtained in
/// one transaction can be used in any later transaction of the same
/// environment as long as the database was committed and not dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Database {
    dbi: Dbi,
    flags: DatabaseFlags,
}

impl Database {
    pub(crate) const fn new(dbi: Dbi, flags: DatabaseFlags) -> Self {
        Self { dbi, flags }
    }

    /// The unnamed main database.
    pub(crate) const fn main() -> Self {
        Self::new(crate::sys::storage::MAIN_DBI, DatabaseFlags::empty())
    }

    /// Returns the identifier of the database within its environment.
    pub const fn dbi(&self) -> u32 {
        self.dbi
    }

    /// Returns the persistent flags of the database.
    pub const fn flags(&self) -> DatabaseFlags {
        self.flags
    }

    /// True if the database holds sorted duplicates.
    pub const fn is_dup_sort(&self) -> bool {
        self.flags.contains(DatabaseFlags::DUP_SORT)
    }
}
