//! Caches for [`Database`] info, used by the [`Tx`] type.
//!
//! [`Tx`]: crate::Tx

use crate::Database;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// Cached database entry.
///
/// Uses hash-only comparison since 64-bit hash collisions are negligible
/// for practical database counts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CachedDb {
    /// Hash of database name (None hashes distinctly from any string).
    name_hash: u64,
    db: Database,
}

impl CachedDb {
    pub(crate) fn new(name: Option<&str>, db: Database) -> Self {
        Self { name_hash: Self::hash_name(name), db }
    }

    #[inline]
    pub(crate) fn hash_name(name: Option<&str>) -> u64 {
        let mut hasher = std::hash::DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }
}

/// Transaction-local cache of database handles.
///
/// Uses inline storage for the common case (most apps use < 16 databases).
#[derive(Debug, Default, Clone)]
#[repr(transparent)]
pub(crate) struct DbCache(SmallVec<[CachedDb; 16]>);

impl DbCache {
    pub(crate) fn read_db(&self, name_hash: u64) -> Option<Database> {
        self.0.iter().find(|entry| entry.name_hash == name_hash).map(|entry| entry.db)
    }

    pub(crate) fn write_db(&mut self, db: CachedDb) {
        self.0.retain(|entry| entry.name_hash != db.name_hash);
        self.0.push(db);
    }

    pub(crate) fn remove_dbi(&mut self, dbi: u32) {
        self.0.retain(|entry| entry.db.dbi() != dbi);
    }
}
