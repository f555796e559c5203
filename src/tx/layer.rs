//! Copy-on-write write sets.
//!
//! Every write transaction owns a [`Layer`] that shadows the layers of its
//! ancestors and, at the bottom, the committed [`Snapshot`]. Aborting a
//! transaction discards its layer. Committing a nested transaction merges its
//! layer into the parent's; committing a top-level transaction applies it to
//! the environment's snapshot.
//!
//! Besides its changes, a layer keeps the full live contents of every table
//! it touches. These are persistent maps seeded from the layer below, so
//! seeding is cheap and navigation never has to step over tombstones.

use crate::sys::storage::{DbRecord, Dbi, Dups, Snapshot, Table};
use std::collections::BTreeMap;

/// Pending changes to one database.
#[derive(Debug, Default, Clone)]
pub(crate) struct TableLayer {
    /// All entries below this layer are hidden.
    pub(crate) cleared: bool,
    /// New duplicate lists per key. `None` is a tombstone.
    pub(crate) entries: BTreeMap<Vec<u8>, Option<Dups>>,
    /// Live contents of the table as seen from this layer. Not persisted.
    pub(crate) live: Table,
}

impl TableLayer {
    fn cleared() -> Self {
        Self { cleared: true, entries: BTreeMap::new(), live: Table::new() }
    }

    /// Records new values for `key`, or removes it with `None`.
    fn put(&mut self, key: Vec<u8>, dups: Option<Dups>) {
        match &dups {
            Some(dups) => {
                self.live.insert(key.clone(), dups.clone());
            }
            None => {
                self.live.remove(key.as_slice());
            }
        }
        self.entries.insert(key, dups);
    }
}

/// Pending changes of one transaction.
#[derive(Debug, Default, Clone)]
pub(crate) struct Layer {
    /// Registry changes. `None` removes the database.
    pub(crate) dbs: BTreeMap<Dbi, Option<DbRecord>>,
    pub(crate) tables: BTreeMap<Dbi, TableLayer>,
}

/// A single change recorded into a [`Layer`].
#[derive(Debug)]
pub(crate) enum Edit {
    /// Replace the values of `key`, or remove the key with `None`.
    Put { dbi: Dbi, key: Vec<u8>, dups: Option<Dups> },
    /// Remove every entry of a database.
    Clear(Dbi),
    /// Create a database or update its flags.
    Register(Dbi, DbRecord),
    /// Remove a database and its entries.
    Unregister(Dbi),
}

impl Edit {
    /// The table whose contents the edit changes, if any.
    pub(crate) const fn table(&self) -> Option<Dbi> {
        match self {
            Self::Put { dbi, .. } => Some(*dbi),
            Self::Clear(_) | Self::Register(..) | Self::Unregister(_) => None,
        }
    }
}

impl Layer {
    /// True if the layer records no changes.
    pub(crate) fn is_empty(&self) -> bool {
        self.dbs.is_empty() && self.tables.is_empty()
    }

    /// True if the layer tracks the contents of `dbi`.
    pub(crate) fn touches(&self, dbi: Dbi) -> bool {
        self.tables.contains_key(&dbi)
    }

    /// Starts tracking `dbi` with `live` as its current contents. Does
    /// nothing if the table is already tracked.
    pub(crate) fn seed(&mut self, dbi: Dbi, live: Table) {
        self.tables.entry(dbi).or_insert_with(|| TableLayer { live, ..TableLayer::default() });
    }

    /// Records an edit.
    ///
    /// Tables written by a [`Edit::Put`] must be seeded first, or their
    /// live contents only reflect this layer.
    pub(crate) fn apply(&mut self, edit: Edit) {
        match edit {
            Edit::Put { dbi, key, dups } => {
                self.tables.entry(dbi).or_default().put(key, dups);
            }
            Edit::Clear(dbi) => {
                self.tables.insert(dbi, TableLayer::cleared());
            }
            Edit::Register(dbi, record) => {
                self.dbs.insert(dbi, Some(record));
            }
            Edit::Unregister(dbi) => {
                self.dbs.insert(dbi, None);
                self.tables.insert(dbi, TableLayer::cleared());
            }
        }
    }

    /// Folds a child's changes on top of this layer. The child wins on
    /// conflicts.
    pub(crate) fn merge(&mut self, child: Self) {
        self.dbs.extend(child.dbs);
        for (dbi, table) in child.tables {
            if table.cleared {
                self.tables.insert(dbi, table);
            } else {
                let parent = self.tables.entry(dbi).or_default();
                parent.entries.extend(table.entries);
                parent.live = table.live;
            }
        }
    }

    /// Applies the changes to a committed snapshot.
    pub(crate) fn apply_to(self, snapshot: &mut Snapshot) {
        for (dbi, record) in self.dbs {
            match record {
                Some(record) => {
                    snapshot.dbs.insert(dbi, record);
                }
                None => {
                    snapshot.dbs.remove(&dbi);
                    snapshot.tables.remove(&dbi);
                }
            }
        }

        for (dbi, layer) in self.tables {
            if !snapshot.dbs.contains_key(&dbi) {
                continue;
            }
            if layer.cleared {
                snapshot.tables.remove(&dbi);
            }
            let table = snapshot.tables.entry(dbi).or_default();
            for (key, dups) in layer.entries {
                match dups {
                    Some(dups) => {
                        table.insert(key, dups);
                    }
                    None => {
                        table.remove(key.as_slice());
                    }
                }
            }
            if table.is_empty() {
                snapshot.tables.remove(&dbi);
            }
        }
    }
}
