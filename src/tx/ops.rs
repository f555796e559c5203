//! Reads and navigation over a layered transaction view.
//!
//! A [`View`] combines the write layers of a transaction chain with the
//! committed [`Snapshot`] the chain started from. Entries found in a layer
//! are pending writes and are copied out; entries found in the snapshot are
//! immutable for the transaction's lifetime and are borrowed.

use crate::{
    DatabaseFlags, KvError, KvResult, Stat, WriteFlags,
    sys::storage::{DbRecord, Dbi, Dups, Snapshot, Table},
    tx::layer::{Layer, TableLayer},
};
use smallvec::smallvec;
use std::{borrow::Cow, cmp::Ordering, collections::BTreeMap, ops::Bound};

/// Cursor operation codes.
pub mod op {
    /// Position at the first key/value item.
    pub const FIRST: u32 = 0;
    /// Position at the first value of the current key.
    pub const FIRST_DUP: u32 = 1;
    /// Position at the exact key/value pair.
    pub const GET_BOTH: u32 = 2;
    /// Position at the key and the first value greater than or equal to the
    /// given value.
    pub const GET_BOTH_RANGE: u32 = 3;
    /// Return the key/value at the current position.
    pub const GET_CURRENT: u32 = 4;
    /// Return every value of the current key, concatenated.
    pub const GET_MULTIPLE: u32 = 5;
    /// Position at the last key/value item.
    pub const LAST: u32 = 6;
    /// Position at the last value of the current key.
    pub const LAST_DUP: u32 = 7;
    /// Position at the next item.
    pub const NEXT: u32 = 8;
    /// Position at the next value of the current key.
    pub const NEXT_DUP: u32 = 9;
    /// Return the remaining values of the current key, concatenated.
    pub const NEXT_MULTIPLE: u32 = 10;
    /// Position at the first value of the next key.
    pub const NEXT_NODUP: u32 = 11;
    /// Position at the previous item.
    pub const PREV: u32 = 12;
    /// Position at the previous value of the current key.
    pub const PREV_DUP: u32 = 13;
    /// Position at the last value of the previous key.
    pub const PREV_NODUP: u32 = 14;
    /// Position at the given key.
    pub const SET: u32 = 15;
    /// Position at the given key, returning key and value.
    pub const SET_KEY: u32 = 16;
    /// Position at the first key greater than or equal to the given key.
    pub const SET_RANGE: u32 = 17;
}

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

/// A live entry located in a view.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Found<'l, 'b> {
    /// A pending write.
    Dirty(&'l [u8], &'l Dups),
    /// Committed data.
    Clean(&'b [u8], &'b Dups),
}

impl<'l, 'b> Found<'l, 'b> {
    pub(crate) fn key(&self) -> &[u8] {
        match self {
            Self::Dirty(key, _) => key,
            Self::Clean(key, _) => key,
        }
    }

    pub(crate) fn dups(&self) -> &[Vec<u8>] {
        match self {
            Self::Dirty(_, dups) => dups,
            Self::Clean(_, dups) => dups,
        }
    }

    /// The key, borrowed if committed.
    pub(crate) fn key_cow(&self) -> Cow<'b, [u8]> {
        match *self {
            Self::Dirty(key, _) => Cow::Owned(key.to_vec()),
            Self::Clean(key, _) => Cow::Borrowed(key),
        }
    }

    /// The value at `idx`, borrowed if committed.
    pub(crate) fn value_cow(&self, idx: usize) -> Cow<'b, [u8]> {
        match *self {
            Self::Dirty(_, dups) => Cow::Owned(dups[idx].clone()),
            Self::Clean(_, dups) => Cow::Borrowed(dups[idx].as_slice()),
        }
    }

    /// All values from `start` concatenated.
    fn values_from(&self, start: usize) -> Cow<'b, [u8]> {
        match *self {
            Self::Clean(_, dups) if dups.len() - start == 1 => Cow::Borrowed(dups[start].as_slice()),
            _ => Cow::Owned(self.dups()[start..].concat()),
        }
    }

    /// Owned copy of the duplicate list.
    pub(crate) fn to_dups(&self) -> Dups {
        match *self {
            Self::Dirty(_, dups) => dups.clone(),
            Self::Clean(_, dups) => dups.clone(),
        }
    }

    fn step(&self, idx: usize) -> Step<'b> {
        let position = Position { key: self.key().to_vec(), value: self.dups()[idx].clone() };
        Step { key: self.key_cow(), value: self.value_cow(idx), position }
    }

    fn first(&self) -> Step<'b> {
        self.step(0)
    }

    fn last(&self) -> Step<'b> {
        self.step(self.dups().len() - 1)
    }
}

/// Logical cursor position: a key and, for duplicates, the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Position {
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
}

/// Result of a successful cursor operation.
#[derive(Debug)]
pub(crate) struct Step<'b> {
    pub(crate) key: Cow<'b, [u8]>,
    pub(crate) value: Cow<'b, [u8]>,
    /// Where the cursor lands.
    pub(crate) position: Position,
}

/// What a put would do to a key.
#[derive(Debug)]
pub(crate) enum PutPlan {
    /// The flags forbid the write. Holds the item the put collided with.
    Exists(Position),
    /// The exact pair is already stored.
    Unchanged,
    /// The new value list for the key.
    Write(Dups),
}

/// A read view over a chain of write layers and a committed snapshot.
#[derive(Debug)]
pub(crate) struct View<'l, 'b> {
    /// Layers, outermost transaction first.
    layers: &'l [&'l Layer],
    base: &'b Snapshot,
}

impl<'l, 'b> View<'l, 'b> {
    pub(crate) const fn new(layers: &'l [&'l Layer], base: &'b Snapshot) -> Self {
        Self { layers, base }
    }

    /// Resolves the registry entry for `dbi`, if the database exists.
    pub(crate) fn db(&self, dbi: Dbi) -> Option<&DbRecord> {
        for layer in self.layers.iter().rev() {
            if let Some(record) = layer.dbs.get(&dbi) {
                return record.as_ref();
            }
        }
        self.base.dbs.get(&dbi)
    }

    /// Like [`View::db`], failing with [`KvError::BadDbi`].
    pub(crate) fn require_db(&self, dbi: Dbi) -> KvResult<&DbRecord> {
        self.db(dbi).ok_or(KvError::BadDbi)
    }

    /// Every live database, in identifier order.
    fn databases(&self) -> BTreeMap<Dbi, &DbRecord> {
        let mut dbs: BTreeMap<Dbi, Option<&DbRecord>> =
            self.base.dbs.iter().map(|(dbi, record)| (*dbi, Some(record))).collect();
        for layer in self.layers {
            for (dbi, record) in &layer.dbs {
                dbs.insert(*dbi, record.as_ref());
            }
        }
        dbs.into_iter().filter_map(|(dbi, record)| record.map(|r| (dbi, r))).collect()
    }

    /// Finds a named database.
    pub(crate) fn find_db(&self, name: &str) -> Option<(Dbi, &DbRecord)> {
        self.databases().into_iter().find(|(_, record)| record.name.as_deref() == Some(name))
    }

    /// Number of named databases.
    pub(crate) fn named_dbs(&self) -> usize {
        self.databases().values().filter(|record| record.name.is_some()).count()
    }

    /// The innermost layer tracking `dbi`, if any.
    fn tracked(&self, dbi: Dbi) -> Option<&'l TableLayer> {
        self.layers.iter().rev().find_map(|layer| layer.tables.get(&dbi))
    }

    /// Current live contents of `dbi`.
    pub(crate) fn live(&self, dbi: Dbi) -> Table {
        match self.tracked(dbi) {
            Some(table) => table.live.clone(),
            None => self.base.tables.get(&dbi).cloned().unwrap_or_default(),
        }
    }

    /// Looks up the live values of `key`.
    pub(crate) fn lookup(&self, dbi: Dbi, key: &[u8]) -> Option<Found<'l, 'b>> {
        for layer in self.layers.iter().rev() {
            let Some(table) = layer.tables.get(&dbi) else { continue };
            if let Some((key, dups)) = table.entries.get_key_value(key) {
                return dups.as_ref().map(|dups| Found::Dirty(key.as_slice(), dups));
            }
            if table.cleared {
                return None;
            }
        }
        let (key, dups) = self.base.tables.get(&dbi)?.get_key_value(key)?;
        Some(Found::Clean(key.as_slice(), dups))
    }

    /// Finds the nearest live key at or beyond `bound` in the given
    /// direction.
    pub(crate) fn seek(
        &self,
        dbi: Dbi,
        bound: Bound<&[u8]>,
        direction: Direction,
    ) -> Option<Found<'l, 'b>> {
        match self.tracked(dbi) {
            // Pending writes decide which keys are live; the lookup tells
            // dirty entries from clean ones.
            Some(table) => {
                let (key, _) = nearest(&table.live, bound, direction)?;
                self.lookup(dbi, key)
            }
            None => {
                let (key, dups) = nearest(self.base.tables.get(&dbi)?, bound, direction)?;
                Some(Found::Clean(key.as_slice(), dups))
            }
        }
    }

    /// Decides how `data` is stored under `key` without changing anything.
    pub(crate) fn plan_put(
        &self,
        dbi: Dbi,
        db_flags: DatabaseFlags,
        key: &[u8],
        data: &[u8],
        flags: WriteFlags,
    ) -> KvResult<PutPlan> {
        let dup_sort = db_flags.contains(DatabaseFlags::DUP_SORT);
        let existing = self.lookup(dbi, key);

        if flags.contains(WriteFlags::APPEND)
            && let Some(last) = self.seek(dbi, Bound::Unbounded, Direction::Backward)
        {
            let in_order = match key.cmp(last.key()) {
                Ordering::Greater => true,
                Ordering::Equal => dup_sort && last.dups().last().is_some_and(|v| data > v.as_slice()),
                Ordering::Less => false,
            };
            if !in_order {
                return Err(KvError::KeyMismatch);
            }
        }
        if flags.contains(WriteFlags::APPEND_DUP)
            && dup_sort
            && let Some(found) = &existing
            && found.dups().last().is_some_and(|v| data <= v.as_slice())
        {
            return Err(KvError::KeyMismatch);
        }

        let Some(found) = existing else {
            return Ok(PutPlan::Write(smallvec![data.to_vec()]));
        };

        if !dup_sort {
            if flags.contains(WriteFlags::NO_OVERWRITE) {
                return Ok(PutPlan::Exists(Position {
                    key: key.to_vec(),
                    value: found.dups()[0].clone(),
                }));
            }
            return Ok(PutPlan::Write(smallvec![data.to_vec()]));
        }

        match found.dups().binary_search_by(|v| v.as_slice().cmp(data)) {
            Ok(_) if flags.intersects(WriteFlags::NO_OVERWRITE | WriteFlags::NO_DUP_DATA) => {
                Ok(PutPlan::Exists(Position { key: key.to_vec(), value: data.to_vec() }))
            }
            Ok(_) => Ok(PutPlan::Unchanged),
            Err(_)
                if flags.contains(WriteFlags::NO_OVERWRITE | WriteFlags::NO_DUP_DATA) =>
            {
                Ok(PutPlan::Exists(Position {
                    key: key.to_vec(),
                    value: found.dups()[0].clone(),
                }))
            }
            Err(idx) => {
                if db_flags.contains(DatabaseFlags::DUP_FIXED) && found.dups()[0].len() != data.len()
                {
                    return Err(KvError::BadValSize);
                }
                let mut dups = found.to_dups();
                dups.insert(idx, data.to_vec());
                Ok(PutPlan::Write(dups))
            }
        }
    }

    /// Visits every live entry of `dbi` in key order.
    pub(crate) fn for_each(&self, dbi: Dbi, mut f: impl FnMut(&[u8], &[Vec<u8>])) {
        let mut next = self.seek(dbi, Bound::Unbounded, Direction::Forward);
        while let Some(found) = next {
            f(found.key(), found.dups());
            next = self.seek(dbi, Bound::Excluded(found.key()), Direction::Forward);
        }
    }

    /// Computes the shape statistics of `dbi`.
    pub(crate) fn stat(&self, dbi: Dbi, page_size: u32) -> Stat {
        let mut builder = StatBuilder::new(page_size);
        self.for_each(dbi, |key, dups| {
            for value in dups {
                builder.add(key, value);
            }
        });
        builder.finish()
    }

    /// Executes a cursor operation.
    ///
    /// `position` is the cursor's current position, `key` and `data` are the
    /// operation's arguments. Returns `None` if the operation found nothing.
    pub(crate) fn cursor_get(
        &self,
        dbi: Dbi,
        flags: DatabaseFlags,
        position: Option<&Position>,
        key: Option<&[u8]>,
        data: Option<&[u8]>,
        op: u32,
    ) -> KvResult<Option<Step<'b>>> {
        let dup_sort = flags.contains(DatabaseFlags::DUP_SORT);
        let forward = |bound: Bound<&[u8]>| self.seek(dbi, bound, Direction::Forward);
        let backward = |bound: Bound<&[u8]>| self.seek(dbi, bound, Direction::Backward);
        // Live entry at the current position, if the key still exists.
        let current = || position.and_then(|pos| self.lookup(dbi, &pos.key).map(|f| (pos, f)));

        let step = match op {
            op::FIRST => forward(Bound::Unbounded).map(|f| f.first()),
            op::LAST => backward(Bound::Unbounded).map(|f| f.last()),
            op::NEXT => match position {
                None => forward(Bound::Unbounded).map(|f| f.first()),
                Some(pos) => {
                    let in_key = current().filter(|_| dup_sort).and_then(|(pos, found)| {
                        let idx = found.dups().partition_point(|v| v.as_slice() <= pos.value.as_slice());
                        (idx < found.dups().len()).then(|| found.step(idx))
                    });
                    in_key.or_else(|| forward(Bound::Excluded(pos.key.as_slice())).map(|f| f.first()))
                }
            },
            op::PREV => match position {
                None => backward(Bound::Unbounded).map(|f| f.last()),
                Some(pos) => {
                    let in_key = current().filter(|_| dup_sort).and_then(|(pos, found)| {
                        let idx = found.dups().partition_point(|v| v.as_slice() < pos.value.as_slice());
                        idx.checked_sub(1).map(|idx| found.step(idx))
                    });
                    in_key.or_else(|| backward(Bound::Excluded(pos.key.as_slice())).map(|f| f.last()))
                }
            },
            op::NEXT_NODUP => match position {
                None => forward(Bound::Unbounded).map(|f| f.first()),
                Some(pos) => forward(Bound::Excluded(pos.key.as_slice())).map(|f| f.first()),
            },
            op::PREV_NODUP => match position {
                None => backward(Bound::Unbounded).map(|f| f.last()),
                Some(pos) => backward(Bound::Excluded(pos.key.as_slice())).map(|f| f.last()),
            },
            op::NEXT_DUP => current().and_then(|(pos, found)| {
                let idx = found.dups().partition_point(|v| v.as_slice() <= pos.value.as_slice());
                (idx < found.dups().len()).then(|| found.step(idx))
            }),
            op::PREV_DUP => current().and_then(|(pos, found)| {
                let idx = found.dups().partition_point(|v| v.as_slice() < pos.value.as_slice());
                idx.checked_sub(1).map(|idx| found.step(idx))
            }),
            op::FIRST_DUP => current().map(|(_, found)| found.first()),
            op::LAST_DUP => current().map(|(_, found)| found.last()),
            op::GET_CURRENT => current().and_then(|(pos, found)| {
                if dup_sort {
                    found.dups().binary_search(&pos.value).ok().map(|idx| found.step(idx))
                } else {
                    Some(found.first())
                }
            }),
            op::SET | op::SET_KEY => {
                let key = required_key(key)?;
                self.lookup(dbi, key).map(|f| f.first())
            }
            op::SET_RANGE => forward(Bound::Included(key.unwrap_or_default())).map(|f| f.first()),
            op::GET_BOTH | op::GET_BOTH_RANGE => {
                let key = required_key(key)?;
                let data = data.unwrap_or_default();
                self.lookup(dbi, key).and_then(|found| {
                    let idx = found.dups().partition_point(|v| v.as_slice() < data);
                    let hit = idx < found.dups().len()
                        && (op == op::GET_BOTH_RANGE || found.dups()[idx] == data);
                    hit.then(|| found.step(idx))
                })
            }
            op::GET_MULTIPLE | op::NEXT_MULTIPLE => current().and_then(|(pos, found)| {
                let start = if op == op::GET_MULTIPLE {
                    0
                } else {
                    found.dups().partition_point(|v| v.as_slice() <= pos.value.as_slice())
                };
                (start < found.dups().len()).then(|| {
                    let mut step = found.last();
                    step.value = found.values_from(start);
                    step
                })
            }),
            _ => None,
        };
        Ok(step)
    }
}

/// The first entry of `table` at or beyond `bound` in the given direction.
fn nearest<'t>(
    table: &'t Table,
    bound: Bound<&[u8]>,
    direction: Direction,
) -> Option<(&'t Vec<u8>, &'t Dups)> {
    let inclusive = match bound {
        Bound::Excluded(key) => Bound::Included(key),
        bound => bound,
    };
    let admits = |key: &[u8]| !matches!(bound, Bound::Excluded(excluded) if excluded == key);
    match direction {
        Direction::Forward => {
            table.range::<_, [u8]>((inclusive, Bound::Unbounded)).find(|(key, _)| admits(key))
        }
        Direction::Backward => {
            table.range::<_, [u8]>((Bound::Unbounded, inclusive)).rev().find(|(key, _)| admits(key))
        }
    }
}

fn required_key(key: Option<&[u8]>) -> KvResult<&[u8]> {
    match key {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(KvError::BadValSize),
    }
}

/// Bytes of per-page header.
const PAGE_HEADER: usize = 20;
/// Bytes of per-node header.
const NODE_HEADER: usize = 8;

/// Models B-tree shape statistics from entry sizes.
#[derive(Debug)]
pub(crate) struct StatBuilder {
    page_size: usize,
    entries: usize,
    key_bytes: usize,
    leaf_bytes: usize,
    overflow_pages: usize,
}

impl StatBuilder {
    pub(crate) const fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size as usize,
            entries: 0,
            key_bytes: 0,
            leaf_bytes: 0,
            overflow_pages: 0,
        }
    }

    pub(crate) const fn add(&mut self, key: &[u8], value: &[u8]) {
        self.entries += 1;
        self.key_bytes += key.len();
        if value.len() > self.page_size / 4 {
            self.leaf_bytes += NODE_HEADER + key.len() + 8;
            self.overflow_pages += (value.len() + PAGE_HEADER).div_ceil(self.page_size);
        } else {
            self.leaf_bytes += NODE_HEADER + key.len() + value.len();
        }
    }

    pub(crate) fn finish(self) -> Stat {
        if self.entries == 0 {
            return Stat::new(self.page_size as u32, 0, 0, 0, 0, 0);
        }
        let usable = self.page_size - PAGE_HEADER;
        let leaf_pages = self.leaf_bytes.div_ceil(usable);
        let avg_key = self.key_bytes / self.entries;
        let fanout = (usable / (NODE_HEADER + avg_key + 2)).max(2);

        let mut depth = 1;
        let mut branch_pages = 0;
        let mut level = leaf_pages;
        while level > 1 {
            level = level.div_ceil(fanout);
            branch_pages += level;
            depth += 1;
        }

        Stat::new(
            self.page_size as u32,
            depth,
            branch_pages,
            leaf_pages,
            self.overflow_pages,
            self.entries,
        )
    }
}
