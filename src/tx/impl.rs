use crate::{
    Cursor, Database, DatabaseFlags, Environment, KvError, KvResult, ReadResult, Stat,
    TableObject, TransactionKind, TxView, WriteFlags,
    sys::storage::{DbRecord, Dbi, MAIN_DBI, Snapshot, Table},
    tx::{
        assertions,
        cache::{CachedDb, DbCache},
        kind::WriteMarker,
        layer::{Edit, Layer},
        ops::{Direction, PutPlan, View},
    },
};
use core::fmt;
use parking_lot::{Mutex, MutexGuard, RwLock};
use smallvec::{SmallVec, smallvec};
use std::{
    marker::PhantomData,
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};
use tracing::{debug, instrument};

const ACTIVE: u8 = 0;
/// A nested transaction is running; this one is suspended until it ends.
const HAS_CHILD: u8 = 1;
const COMMITTED: u8 = 2;
const ABORTED: u8 = 3;

pub(crate) type Edits = SmallVec<[Edit; 1]>;

/// Shared state of a transaction, referenced by its nested children.
struct TxInner {
    env: Environment,
    id: u64,
    /// Writer admission ticket, shared by nested transactions. Zero for
    /// readers.
    ticket: u64,
    /// Committed state the transaction chain started from.
    snapshot: Arc<Snapshot>,
    /// Pending writes of this transaction. Always empty for readers.
    layer: Mutex<Layer>,
    parent: Option<Arc<TxInner>>,
    state: AtomicU8,
    cache: RwLock<DbCache>,
    span: tracing::Span,
}

impl TxInner {
    /// The transaction chain, outermost first.
    fn chain(&self) -> SmallVec<[&Self; 4]> {
        let mut chain: SmallVec<[&Self; 4]> = smallvec![self];
        let mut next = self.parent.as_deref();
        while let Some(parent) = next {
            chain.push(parent);
            next = parent.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// True while the transaction and its ancestors have not finished.
    fn is_alive(&self) -> bool {
        if self.env.is_closed() || self.state.load(Ordering::Acquire) > HAS_CHILD {
            return false;
        }
        let mut next = self.parent.as_deref();
        while let Some(parent) = next {
            if parent.state.load(Ordering::Acquire) != HAS_CHILD {
                return false;
            }
            next = parent.parent.as_deref();
        }
        true
    }
}

/// A transaction.
///
/// Read-only transactions ([`Ro`](crate::Ro)) observe the database as it was committed
/// when they began, no matter what is committed afterwards. Read-write
/// transactions ([`Rw`](crate::Rw)) additionally observe their own pending writes, and
/// may nest: see [`Tx::begin_nested_txn`].
///
/// A transaction ends exactly once, by [`Tx::commit`], [`Tx::abort`], or by
/// being dropped, which aborts it. Values and cursors borrowed from a
/// transaction cannot outlive it.
pub struct Tx<K: TransactionKind> {
    inner: Arc<TxInner>,
    /// Database used by the `_default` convenience methods.
    db: Database,
    _kind: PhantomData<K>,
}

impl<K: TransactionKind> fmt::Debug for Tx<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("id", &self.inner.id)
            .field("read_only", &K::IS_READ_ONLY)
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl<K: TransactionKind> Tx<K> {
    /// Begins a top-level transaction.
    pub(crate) fn begin(env: Environment) -> KvResult<Self> {
        env.ensure_open()?;
        let ticket = if K::IS_READ_ONLY {
            env.acquire_reader()?;
            0
        } else {
            env.acquire_writer()?
        };
        let snapshot = env.snapshot();
        let id = if K::IS_READ_ONLY { snapshot.txn_id } else { snapshot.txn_id + 1 };
        let inner = TxInner {
            env,
            id,
            ticket,
            snapshot,
            layer: Mutex::default(),
            parent: None,
            state: AtomicU8::new(ACTIVE),
            cache: RwLock::default(),
            span: K::new_span(id),
        };
        Ok(Self { inner: Arc::new(inner), db: Database::main(), _kind: PhantomData })
    }

    /// Returns a reference to the environment.
    #[inline(always)]
    pub fn env(&self) -> &Environment {
        &self.inner.env
    }

    /// Returns the tracing span for this transaction.
    #[inline(always)]
    pub fn span(&self) -> &tracing::Span {
        &self.inner.span
    }

    /// Returns the transaction id.
    ///
    /// Read-only transactions report the id of the commit they observe.
    /// Write transactions report the id their commit will receive; nested
    /// transactions share the id of their top-level transaction.
    #[inline(always)]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the default database of this transaction. Initially the
    /// unnamed main database.
    #[inline(always)]
    pub const fn db(&self) -> Database {
        self.db
    }

    /// Rebinds the default database.
    pub fn with_db(mut self, db: Database) -> Self {
        self.db = db;
        self
    }

    /// True while the transaction can still be used.
    ///
    /// Becomes false when the environment closes, or when a nested
    /// transaction's parent ends.
    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Fails with a closed-handle error once the transaction's data can no
    /// longer be read.
    pub(crate) fn check_alive(&self) -> KvResult<()> {
        self.inner.env.ensure_open()?;
        if self.inner.is_alive() { Ok(()) } else { Err(KvError::TxnFinished) }
    }

    /// Fails unless the transaction may be operated on right now.
    fn ensure_active(&self) -> KvResult<()> {
        self.inner.env.ensure_open()?;
        match self.inner.state.load(Ordering::Acquire) {
            ACTIVE => {}
            HAS_CHILD => return Err(KvError::BadTxn),
            _ => return Err(KvError::TxnFinished),
        }
        if !self.inner.is_alive() {
            return Err(KvError::TxnFinished);
        }
        if !K::IS_READ_ONLY {
            self.inner.env.enter_writer(self.inner.ticket);
        }
        Ok(())
    }

    /// Runs `f` against the transaction's view of the data.
    pub(crate) fn with_view<'tx, R>(
        &'tx self,
        f: impl for<'l> FnOnce(&View<'l, 'tx>) -> R,
    ) -> KvResult<R> {
        self.ensure_active()?;
        let guards: SmallVec<[MutexGuard<'_, Layer>; 4]> =
            self.inner.chain().into_iter().map(|tx| tx.layer.lock()).collect();
        let layers: SmallVec<[&Layer; 4]> = guards.iter().map(|guard| &**guard).collect();
        Ok(f(&View::new(&layers, &self.inner.snapshot)))
    }

    /// Validates a key against the environment's size limit.
    fn check_key(&self, key: &[u8]) -> KvResult<()> {
        assertions::check_key(self.inner.env.max_key_size(), key)
    }

    /// Gets an item from a database.
    ///
    /// For [`DatabaseFlags::DUP_SORT`] databases, returns the first value of
    /// the key. A missing key is `Ok(None)`; an empty or oversized key fails
    /// with [`KvError::BadValSize`].
    ///
    /// Committed data is borrowed from the transaction when `Value` allows
    /// it, such as `Cow<'tx, [u8]>`. Pending writes are copied.
    pub fn get<'tx, Value>(&'tx self, db: Database, key: &[u8]) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.check_key(key)?;
        let dbi = db.dbi();
        let value = self.with_view(|view| {
            view.require_db(dbi)?;
            Ok::<_, KvError>(view.lookup(dbi, key).map(|found| found.value_cow(0)))
        })??;
        value.map(Value::decode_borrow).transpose()
    }

    /// [`Tx::get`] on the default database.
    pub fn get_default<'tx, Value>(&'tx self, key: &[u8]) -> ReadResult<Option<Value>>
    where
        Value: TableObject<'tx>,
    {
        self.get(self.db, key)
    }

    /// Gets an item, wrapped in a [`TxView`] that re-checks the transaction
    /// before giving access.
    pub fn get_view<'tx, Value>(
        &'tx self,
        db: Database,
        key: &[u8],
    ) -> ReadResult<Option<TxView<'tx, K, Value>>>
    where
        Value: TableObject<'tx>,
    {
        Ok(self.get(db, key)?.map(|value| TxView::new(value, self)))
    }

    /// Opens a handle to a database.
    ///
    /// `None` opens the unnamed main database. Handles are cached per
    /// transaction; opening the same name twice yields the same handle.
    /// Fails with [`KvError::NotFound`] if the database does not exist.
    pub fn open_db(&self, name: Option<&str>) -> KvResult<Database> {
        let name_hash = CachedDb::hash_name(name);
        let cached = self.inner.cache.read().read_db(name_hash);
        let db = self.with_view(|view| {
            if let Some(db) = cached
                && view.db(db.dbi()).is_some_and(|record| record.name.as_deref() == name)
            {
                return Ok(db);
            }
            match name {
                None => Ok(Database::new(MAIN_DBI, view.require_db(MAIN_DBI)?.flags)),
                Some(name) => view
                    .find_db(name)
                    .map(|(dbi, record)| Database::new(dbi, record.flags))
                    .ok_or(KvError::NotFound),
            }
        })??;
        self.inner.cache.write().write_db(CachedDb::new(name, db));
        Ok(db)
    }

    /// Gets the option flags for the given database.
    pub fn db_flags(&self, db: Database) -> KvResult<DatabaseFlags> {
        self.with_view(|view| view.require_db(db.dbi()).map(|record| record.flags))?
    }

    /// Retrieves database statistics, including pending writes.
    pub fn db_stat(&self, db: Database) -> KvResult<Stat> {
        let page_size = self.inner.env.page_size();
        self.with_view(|view| {
            view.require_db(db.dbi())?;
            Ok(view.stat(db.dbi(), page_size))
        })?
    }

    /// Opens a cursor on the given database.
    ///
    /// Multiple cursors can be open simultaneously within the same
    /// transaction, and observe each other's writes.
    pub fn cursor(&self, db: Database) -> KvResult<Cursor<'_, K>> {
        self.with_view(|view| view.require_db(db.dbi()).map(|_| ()))??;
        Ok(Cursor::new(self, db))
    }

    /// Ends the transaction. Only the first call has an effect.
    fn finish(&self, to: u8) {
        let inner = &self.inner;
        let ended = inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state <= HAS_CHILD).then_some(to)
            })
            .is_ok();
        if !ended {
            return;
        }
        match &inner.parent {
            Some(parent) => {
                let _ = parent.state.compare_exchange(
                    HAS_CHILD,
                    ACTIVE,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
            None if K::IS_READ_ONLY => inner.env.release_reader(),
            None => inner.env.release_writer(inner.ticket),
        }
        if to == ABORTED && !K::IS_READ_ONLY {
            debug!(target: "kvdb", parent: &inner.span, "aborted");
        }
    }

    /// Commits the transaction.
    ///
    /// A top-level write transaction durably appends its writes and
    /// publishes them to transactions begun afterwards. A read transaction
    /// only releases its reader slot. A nested transaction folds its
    /// writes into its parent. Fails with [`KvError::BadTxn`] if a nested
    /// transaction is still running; the transaction is then aborted.
    #[instrument(skip(self), parent = &self.inner.span)]
    pub fn commit(self) -> KvResult<()> {
        self.ensure_active()?;
        if K::IS_READ_ONLY {
            self.finish(COMMITTED);
            return Ok(());
        }
        let layer = std::mem::take(&mut *self.inner.layer.lock());

        if let Some(parent) = &self.inner.parent {
            parent.layer.lock().merge(layer);
            self.finish(COMMITTED);
            return Ok(());
        }

        let res = self.inner.env.commit_layer(self.inner.id, layer);
        self.finish(if res.is_ok() { COMMITTED } else { ABORTED });
        res
    }

    /// Aborts the transaction, discarding its pending writes.
    ///
    /// Equivalent to dropping it.
    pub fn abort(self) {
        self.finish(ABORTED);
    }
}

// Write-only
impl<K: TransactionKind + WriteMarker> Tx<K> {
    /// Computes edits against the current view and records them in this
    /// transaction's layer. No edit is recorded if `f` fails.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&View<'_, '_>) -> KvResult<(Edits, R)>,
    ) -> KvResult<R> {
        self.ensure_active()?;
        let mut guards: SmallVec<[MutexGuard<'_, Layer>; 4]> =
            self.inner.chain().into_iter().map(|tx| tx.layer.lock()).collect();
        let (edits, out, seeds) = {
            let layers: SmallVec<[&Layer; 4]> = guards.iter().map(|guard| &**guard).collect();
            let view = View::new(&layers, &self.inner.snapshot);
            let (edits, out) = f(&view)?;
            let own = layers.last();
            let seeds: SmallVec<[(Dbi, Table); 1]> = edits
                .iter()
                .filter_map(Edit::table)
                .filter(|dbi| !own.is_some_and(|layer| layer.touches(*dbi)))
                .map(|dbi| (dbi, view.live(dbi)))
                .collect();
            (edits, out, seeds)
        };
        if let Some(layer) = guards.last_mut() {
            for (dbi, live) in seeds {
                layer.seed(dbi, live);
            }
            for edit in edits {
                layer.apply(edit);
            }
        }
        Ok(out)
    }

    /// Opens a handle to a database, creating the database if necessary.
    ///
    /// If the database exists with the same [`DatabaseFlags::DUP_SORT`] and
    /// [`DatabaseFlags::DUP_FIXED`] settings, its handle is returned; with
    /// different settings this fails with [`KvError::Incompatible`]. The
    /// unnamed main database is the exception while it has no flags and no
    /// entries: it then adopts the requested flags.
    ///
    /// If `name` is not [None], the environment must be configured to allow
    /// named databases through [`EnvironmentBuilder::set_max_dbs()`], or
    /// this fails with [`KvError::DbsFull`]. The database becomes visible to
    /// other transactions once this transaction commits.
    ///
    /// [`EnvironmentBuilder::set_max_dbs()`]: crate::EnvironmentBuilder::set_max_dbs
    pub fn create_db(&self, name: Option<&str>, flags: DatabaseFlags) -> KvResult<Database> {
        let wanted = flags.persistent();
        let max_dbs = self.inner.env.max_dbs();
        let db = self.write(|view| {
            let existing = match name {
                None => Some((MAIN_DBI, view.require_db(MAIN_DBI)?)),
                Some(name) => view.find_db(name),
            };
            if let Some((dbi, record)) = existing {
                if record.flags == wanted {
                    return Ok((Edits::new(), Database::new(dbi, wanted)));
                }
                // The main database always exists. It takes its flags once,
                // while it is still plain and empty.
                let unconfigured = dbi == MAIN_DBI
                    && record.flags.is_empty()
                    && view.seek(dbi, Bound::Unbounded, Direction::Forward).is_none();
                if !unconfigured {
                    return Err(KvError::Incompatible);
                }
                let record = DbRecord { name: record.name.clone(), flags: wanted };
                return Ok((smallvec![Edit::Register(dbi, record)], Database::new(dbi, wanted)));
            }

            if view.named_dbs() >= max_dbs {
                return Err(KvError::DbsFull);
            }
            let dbi = self.inner.env.next_dbi();
            let record = DbRecord { name: name.map(str::to_owned), flags: wanted };
            Ok((smallvec![Edit::Register(dbi, record)], Database::new(dbi, wanted)))
        })?;
        self.inner.cache.write().write_db(CachedDb::new(name, db));
        Ok(db)
    }

    /// Stores an item into a database.
    ///
    /// The default behavior is to enter the new key/data pair, replacing any
    /// previously existing key if duplicates are disallowed, or adding a
    /// duplicate data item if duplicates are allowed
    /// ([`DatabaseFlags::DUP_SORT`]).
    ///
    /// Returns `false`, without writing, when [`WriteFlags::NO_OVERWRITE`]
    /// or [`WriteFlags::NO_DUP_DATA`] forbid the write. Fails with
    /// [`KvError::KeyMismatch`] when [`WriteFlags::APPEND`] or
    /// [`WriteFlags::APPEND_DUP`] are violated.
    pub fn put(
        &self,
        db: Database,
        key: impl AsRef<[u8]>,
        data: impl AsRef<[u8]>,
        flags: WriteFlags,
    ) -> KvResult<bool> {
        let (key, data) = (key.as_ref(), data.as_ref());
        self.check_key(key)?;
        let max = self.inner.env.max_key_size();
        let dbi = db.dbi();
        self.write(|view| {
            let db_flags = view.require_db(dbi)?.flags;
            assertions::check_value(max, db_flags, data)?;
            Ok(match view.plan_put(dbi, db_flags, key, data, flags)? {
                PutPlan::Exists(_) => (Edits::new(), false),
                PutPlan::Unchanged => (Edits::new(), true),
                PutPlan::Write(dups) => {
                    (smallvec![Edit::Put { dbi, key: key.to_vec(), dups: Some(dups) }], true)
                }
            })
        })
    }

    /// [`Tx::put`] on the default database.
    pub fn put_default(
        &self,
        key: impl AsRef<[u8]>,
        data: impl AsRef<[u8]>,
        flags: WriteFlags,
    ) -> KvResult<bool> {
        self.put(self.db, key, data, flags)
    }

    /// Appends a key/data pair to the end of the database.
    ///
    /// The key must be greater than all existing keys, otherwise this fails
    /// with [`KvError::KeyMismatch`].
    pub fn append(
        &self,
        db: Database,
        key: impl AsRef<[u8]>,
        data: impl AsRef<[u8]>,
    ) -> KvResult<()> {
        self.put(db, key, data, WriteFlags::APPEND).map(drop)
    }

    /// Appends duplicate data for [`DatabaseFlags::DUP_SORT`] databases.
    ///
    /// The data must be greater than all existing data for this key,
    /// otherwise this fails with [`KvError::KeyMismatch`].
    pub fn append_dup(
        &self,
        db: Database,
        key: impl AsRef<[u8]>,
        data: impl AsRef<[u8]>,
    ) -> KvResult<()> {
        if !db.is_dup_sort() {
            return Err(KvError::RequiresDupSort);
        }
        self.put(db, key, data, WriteFlags::APPEND_DUP).map(drop)
    }

    /// Stores `data` under `key`, returning the previous value.
    ///
    /// For [`DatabaseFlags::DUP_SORT`] databases every existing value of the
    /// key is replaced and the first one returned.
    pub fn replace(
        &self,
        db: Database,
        key: impl AsRef<[u8]>,
        data: impl AsRef<[u8]>,
    ) -> KvResult<Option<Vec<u8>>> {
        let (key, data) = (key.as_ref(), data.as_ref());
        self.check_key(key)?;
        let max = self.inner.env.max_key_size();
        let dbi = db.dbi();
        self.write(|view| {
            let db_flags = view.require_db(dbi)?.flags;
            assertions::check_value(max, db_flags, data)?;
            let old = view.lookup(dbi, key).map(|found| found.dups()[0].clone());
            let edit = Edit::Put { dbi, key: key.to_vec(), dups: Some(smallvec![data.to_vec()]) };
            Ok((smallvec![edit], old))
        })
    }

    /// Removes `key`, returning its value. For
    /// [`DatabaseFlags::DUP_SORT`] databases every value is removed and the
    /// first one returned.
    pub fn pop(&self, db: Database, key: impl AsRef<[u8]>) -> KvResult<Option<Vec<u8>>> {
        let key = key.as_ref();
        self.check_key(key)?;
        let dbi = db.dbi();
        self.write(|view| {
            view.require_db(dbi)?;
            Ok(match view.lookup(dbi, key) {
                Some(found) => {
                    let old = found.dups()[0].clone();
                    (smallvec![Edit::Put { dbi, key: key.to_vec(), dups: None }], Some(old))
                }
                None => (Edits::new(), None),
            })
        })
    }

    /// Delete items from a database.
    ///
    /// If `data` is [Some], only the matching data item is deleted; for
    /// databases without duplicates the stored value must equal it.
    /// Otherwise all values of the key are deleted.
    ///
    /// Returns `true` if the key/value pair was present.
    pub fn del(
        &self,
        db: Database,
        key: impl AsRef<[u8]>,
        data: Option<&[u8]>,
    ) -> KvResult<bool> {
        let key = key.as_ref();
        self.check_key(key)?;
        let dbi = db.dbi();
        self.write(|view| {
            view.require_db(dbi)?;
            let Some(found) = view.lookup(dbi, key) else {
                return Ok((Edits::new(), false));
            };
            let dups = match data {
                None => None,
                Some(data) => {
                    let Ok(idx) = found.dups().binary_search_by(|v| v.as_slice().cmp(data)) else {
                        return Ok((Edits::new(), false));
                    };
                    let mut dups = found.to_dups();
                    dups.remove(idx);
                    (!dups.is_empty()).then_some(dups)
                }
            };
            Ok((smallvec![Edit::Put { dbi, key: key.to_vec(), dups }], true))
        })
    }

    /// Empties the given database. All items will be removed; the handle
    /// stays valid.
    pub fn clear_db(&self, db: Database) -> KvResult<()> {
        let dbi = db.dbi();
        self.write(|view| {
            view.require_db(dbi)?;
            Ok((smallvec![Edit::Clear(dbi)], ()))
        })
    }

    /// Drops the database from the environment.
    ///
    /// The main database cannot be removed and is only emptied. Any other
    /// database is removed with its entries, and its handle fails with
    /// [`KvError::BadDbi`] afterwards.
    pub fn drop_db(&self, db: Database) -> KvResult<()> {
        let dbi = db.dbi();
        self.write(|view| {
            view.require_db(dbi)?;
            let edit = if dbi == MAIN_DBI { Edit::Clear(dbi) } else { Edit::Unregister(dbi) };
            Ok((smallvec![edit], ()))
        })?;
        self.inner.cache.write().remove_dbi(dbi);
        Ok(())
    }

    /// Begins a nested transaction inside of this transaction.
    ///
    /// The child observes this transaction's pending writes. While it is
    /// running, this transaction fails every operation with
    /// [`KvError::BadTxn`], as does a second attempt to nest. Committing the
    /// child folds its writes into this transaction; aborting it leaves this
    /// transaction exactly as it was.
    pub fn begin_nested_txn(&self) -> KvResult<Self> {
        self.ensure_active()?;
        self.inner
            .state
            .compare_exchange(ACTIVE, HAS_CHILD, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KvError::BadTxn)?;

        let parent = &self.inner;
        let inner = TxInner {
            env: parent.env.clone(),
            id: parent.id,
            ticket: parent.ticket,
            snapshot: parent.snapshot.clone(),
            layer: Mutex::default(),
            parent: Some(parent.clone()),
            state: AtomicU8::new(ACTIVE),
            cache: RwLock::new(parent.cache.read().clone()),
            span: tracing::debug_span!(target: "kvdb", parent: &parent.span, "nested_txn"),
        };
        Ok(Self { inner: Arc::new(inner), db: self.db, _kind: PhantomData })
    }
}

impl<K: TransactionKind> Drop for Tx<K> {
    fn drop(&mut self) {
        self.finish(ABORTED);
    }
}
