use bitflags::bitflags;

/// Durability of commits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Every commit is flushed to disk, data and metadata, before it
    /// returns.
    #[default]
    Durable,

    /// Commits flush file data but not file metadata. A system crash may
    /// lose the last committed transaction, but the store stays consistent.
    NoMetaSync,

    /// Commits are not flushed. Data reaches disk on [`Environment::sync`]
    /// or when the environment is closed. A system crash may lose recent
    /// transactions; damaged tail records are discarded on the next open.
    ///
    /// [`Environment::sync`]: crate::Environment::sync
    SafeNoSync,

    /// Like [`SyncMode::SafeNoSync`], and additionally the environment
    /// does not flush on close.
    UtterlyNoSync,
}

impl SyncMode {
    /// Maps the classic `sync`, `metasync` and `map_async` open options to
    /// a [`SyncMode`].
    pub const fn from_flags(sync: bool, meta_sync: bool, map_async: bool) -> Self {
        match (sync, meta_sync, map_async) {
            (false, _, true) => Self::UtterlyNoSync,
            (false, _, false) => Self::SafeNoSync,
            (true, false, _) => Self::NoMetaSync,
            (true, true, _) => Self::Durable,
        }
    }
}

/// Environment access mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Open the environment in read-only mode.
    ReadOnly,
    /// Open the environment in read-write mode.
    ReadWrite {
        /// Durability of commits.
        sync_mode: SyncMode,
    },
}

impl Default for Mode {
    fn default() -> Self {
        Self::ReadWrite { sync_mode: SyncMode::default() }
    }
}

impl From<Mode> for EnvironmentFlags {
    fn from(mode: Mode) -> Self {
        Self { mode, ..Default::default() }
    }
}

/// Options for opening an environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentFlags {
    /// Treat the path as the data file itself instead of a directory.
    pub no_sub_dir: bool,
    /// Access mode.
    pub mode: Mode,
}

/// What happens when a write transaction is requested while another one is
/// active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriterAdmission {
    /// Wait until the active writer commits or aborts.
    #[default]
    Block,
    /// Fail immediately with [`KvError::Busy`].
    ///
    /// [`KvError::Busy`]: crate::KvError::Busy
    Fail,
}

bitflags! {
    #[doc="Database options."]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DatabaseFlags: u32 {
        /// Keys may have multiple values, kept in sorted order.
        const DUP_SORT = 0x04;

        /// With [`DatabaseFlags::DUP_SORT`], all values of a key have the
        /// same length. Enables [`Cursor::get_multiple`].
        ///
        /// [`Cursor::get_multiple`]: crate::Cursor::get_multiple
        const DUP_FIXED = 0x10;

        /// Create the named database if it does not exist.
        const CREATE = 0x40000;
    }
}

impl DatabaseFlags {
    /// Flags that are persisted with the database.
    pub(crate) const PERSISTENT: Self = Self::DUP_SORT.union(Self::DUP_FIXED);

    /// Returns the persisted subset of these flags.
    pub(crate) const fn persistent(self) -> Self {
        self.intersection(Self::PERSISTENT)
    }
}

bitflags! {
    #[doc="Write options."]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WriteFlags: u32 {
        /// Insert the new item only if the key does not already appear in the
        /// database.
        const NO_OVERWRITE = 0x10;

        /// Insert the new key/value pair only if it does not already appear
        /// in the database. Only meaningful for
        /// [`DatabaseFlags::DUP_SORT`] databases. With a cursor delete,
        /// removes every value of the current key.
        const NO_DUP_DATA = 0x20;

        /// For cursor puts, replace the item at the current cursor
        /// position. The key must equal the current key.
        const CURRENT = 0x40;

        /// Append the given key/value pair to the end of the database. The
        /// key must sort after every existing key.
        const APPEND = 0x20000;

        /// Append the given value to the end of the key's duplicates.
        const APPEND_DUP = 0x40000;
    }
}

impl WriteFlags {
    /// Maps the `overwrite`, `append` and `dupdata` put options to flags.
    ///
    /// `overwrite = false` refuses to replace an existing key. With
    /// `dupdata = true` on a [`DatabaseFlags::DUP_SORT`] database a new
    /// distinct value is still added under an existing key.
    pub const fn from_options(overwrite: bool, append: bool, dupdata: bool) -> Self {
        let mut flags = Self::empty();
        if !overwrite {
            flags = flags.union(Self::NO_OVERWRITE);
        }
        if append {
            flags = flags.union(Self::APPEND);
        }
        if !dupdata {
            flags = flags.union(Self::NO_DUP_DATA);
        }
        flags
    }
}
