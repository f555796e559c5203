use crate::{
    Database, DatabaseFlags, EnvironmentFlags, KvError, KvResult, Mode, Ro, Rw, SyncMode, Tx,
    WriterAdmission,
    sys::{
        storage::{DATA_FILE, DataFile, Dbi, MAIN_DBI, MAX_PAGE_SIZE, MIN_PAGE_SIZE, Snapshot},
        txn_manager::WriterGate,
    },
    tx::{layer::Layer, ops::View},
};
use parking_lot::{Mutex, RwLock};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    },
};
use tracing::debug;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default maximum number of concurrent read transactions.
pub const DEFAULT_MAX_READERS: u32 = 126;

/// An environment supports multiple databases, all residing in the same
/// data file.
///
/// Cloning is cheap; clones refer to the same environment.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

struct EnvironmentInner {
    path: PathBuf,
    page_size: u32,
    max_dbs: usize,
    max_readers: u32,
    mode: Mode,
    admission: WriterAdmission,
    closed: AtomicBool,
    /// Latest committed snapshot.
    state: RwLock<Arc<Snapshot>>,
    /// `None` once the environment is closed.
    data: Mutex<Option<DataFile>>,
    gate: WriterGate,
    readers: AtomicUsize,
    next_dbi: AtomicU32,
}

impl EnvironmentInner {
    fn close(&self) -> KvResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let file = self.data.lock().take();
        self.gate.wake_all();
        debug!(target: "kvdb", path = %self.path.display(), "closing environment");
        match (file, self.mode) {
            (Some(mut file), Mode::ReadWrite { sync_mode }) if sync_mode != SyncMode::UtterlyNoSync => {
                file.sync(false)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for EnvironmentInner {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl Environment {
    /// Creates a new builder for specifying options for opening an
    /// environment.
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Returns true if the environment was opened in [`Mode::ReadOnly`].
    pub fn is_read_only(&self) -> bool {
        matches!(self.inner.mode, Mode::ReadOnly)
    }

    /// Returns true if the environment was opened in [`Mode::ReadWrite`].
    pub fn is_read_write(&self) -> bool {
        !self.is_read_only()
    }

    /// Returns true once [`Environment::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the path the environment was opened with.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns the configured maximum number of named databases.
    pub fn max_dbs(&self) -> usize {
        self.inner.max_dbs
    }

    /// Returns the page size used for size limits and statistics.
    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    /// Maximum size of a key, and of a value in a
    /// [`DatabaseFlags::DUP_SORT`] database.
    pub fn max_key_size(&self) -> usize {
        (self.inner.page_size as usize - 20) / 2 - 8
    }

    /// Create a read-only transaction for use with the environment.
    pub fn begin_ro_txn(&self) -> KvResult<Tx<Ro>> {
        Tx::<Ro>::begin(self.clone())
    }

    /// Create a read-write transaction for use with the environment.
    ///
    /// Only one top-level write transaction may exist at a time. If another
    /// is active, this either waits for it or fails with [`KvError::Busy`],
    /// according to [`EnvironmentBuilder::set_writer_admission`].
    pub fn begin_rw_txn(&self) -> KvResult<Tx<Rw>> {
        Tx::<Rw>::begin(self.clone())
    }

    /// Opens a database, creating it when `flags` contains
    /// [`DatabaseFlags::CREATE`].
    ///
    /// Opening is idempotent: the same name yields the same handle. Creating
    /// runs and commits its own write transaction, so it must not be called
    /// while the calling thread holds a write transaction.
    ///
    /// Fails with [`KvError::Incompatible`] if the database exists and
    /// `flags` disagree with it on [`DatabaseFlags::DUP_SORT`] or
    /// [`DatabaseFlags::DUP_FIXED`]. See [`Tx::create_db`] for how the main
    /// database takes its flags.
    pub fn open_db(&self, name: Option<&str>, flags: DatabaseFlags) -> KvResult<Database> {
        if flags.contains(DatabaseFlags::CREATE) {
            let txn = self.begin_rw_txn()?;
            let db = txn.create_db(name, flags)?;
            txn.commit()?;
            Ok(db)
        } else {
            let txn = self.begin_ro_txn()?;
            let db = txn.open_db(name)?;
            if flags.persistent() != db.flags() {
                return Err(KvError::Incompatible);
            }
            Ok(db)
        }
    }

    /// Retrieves statistics about the main database.
    pub fn stat(&self) -> KvResult<Stat> {
        self.db_stat_by_dbi(MAIN_DBI)
    }

    /// Retrieves statistics about the given database as of the latest
    /// commit.
    pub fn db_stat(&self, db: Database) -> KvResult<Stat> {
        self.db_stat_by_dbi(db.dbi())
    }

    fn db_stat_by_dbi(&self, dbi: Dbi) -> KvResult<Stat> {
        self.ensure_open()?;
        let snapshot = self.snapshot();
        let view = View::new(&[], &snapshot);
        view.require_db(dbi)?;
        Ok(view.stat(dbi, self.inner.page_size))
    }

    /// Retrieves information about this environment.
    pub fn info(&self) -> KvResult<Info> {
        self.ensure_open()?;
        let data = self.inner.data.lock();
        let file = data.as_ref().ok_or(KvError::EnvClosed)?;
        Ok(Info {
            map_size: file.map_size(),
            data_size: file.len(),
            last_txnid: self.snapshot().txn_id,
            num_readers: self.inner.readers.load(Ordering::Acquire),
            max_readers: self.inner.max_readers,
            mode: self.inner.mode,
        })
    }

    /// Flushes buffered commits to disk.
    ///
    /// Only needed with [`SyncMode::SafeNoSync`] and
    /// [`SyncMode::UtterlyNoSync`]. With `force`, flushes even when nothing
    /// is pending.
    pub fn sync(&self, force: bool) -> KvResult<()> {
        if self.is_read_only() {
            return Err(KvError::Readonly);
        }
        let mut data = self.inner.data.lock();
        data.as_mut().ok_or(KvError::EnvClosed)?.sync(force)
    }

    /// Closes the environment.
    ///
    /// Buffered commits are flushed, except in [`SyncMode::UtterlyNoSync`].
    /// Every transaction, cursor and view derived from this environment
    /// fails with a closed-handle error afterwards. Closing twice is a
    /// no-op.
    pub fn close(&self) -> KvResult<()> {
        self.inner.close()
    }

    pub(crate) fn ensure_open(&self) -> KvResult<()> {
        if self.is_closed() { Err(KvError::EnvClosed) } else { Ok(()) }
    }

    /// The latest committed snapshot.
    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.state.read().clone()
    }

    /// Acquires the single-writer token, returning its ticket.
    pub(crate) fn acquire_writer(&self) -> KvResult<u64> {
        if self.is_read_only() {
            return Err(KvError::Readonly);
        }
        self.inner.gate.acquire(self.inner.admission, &self.inner.closed)
    }

    /// Marks the calling thread as the one operating the writer.
    pub(crate) fn enter_writer(&self, ticket: u64) {
        self.inner.gate.enter(ticket);
    }

    pub(crate) fn release_writer(&self, ticket: u64) {
        self.inner.gate.release(ticket);
    }

    /// Registers a reader slot.
    pub(crate) fn acquire_reader(&self) -> KvResult<()> {
        let max = self.inner.max_readers as usize;
        self.inner
            .readers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map(|_| ())
            .map_err(|_| KvError::ReadersFull)
    }

    pub(crate) fn release_reader(&self) {
        self.inner.readers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Allocates an identifier for a new database.
    pub(crate) fn next_dbi(&self) -> Dbi {
        self.inner.next_dbi.fetch_add(1, Ordering::AcqRel)
    }

    /// Durably appends `layer` and publishes it as the latest snapshot.
    pub(crate) fn commit_layer(&self, txn_id: u64, layer: Layer) -> KvResult<()> {
        if layer.is_empty() {
            return Ok(());
        }
        let Mode::ReadWrite { sync_mode } = self.inner.mode else {
            return Err(KvError::Readonly);
        };

        let mut data = self.inner.data.lock();
        let file = data.as_mut().ok_or(KvError::EnvClosed)?;
        let written = file.append(txn_id, &layer, sync_mode)?;

        let mut state = self.inner.state.write();
        let snapshot = Arc::make_mut(&mut state);
        layer.apply_to(snapshot);
        snapshot.txn_id = txn_id;

        debug!(target: "kvdb", txn_id, bytes = written, "committed");
        Ok(())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("path", &self.inner.path)
            .field("mode", &self.inner.mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    page_size: u32,
    depth: u32,
    branch_pages: usize,
    leaf_pages: usize,
    overflow_pages: usize,
    entries: usize,
}

impl Stat {
    pub(crate) const fn new(
        page_size: u32,
        depth: u32,
        branch_pages: usize,
        leaf_pages: usize,
        overflow_pages: usize,
        entries: usize,
    ) -> Self {
        Self { page_size, depth, branch_pages, leaf_pages, overflow_pages, entries }
    }

    /// Size of a database page.
    #[inline]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Depth (height) of the B-tree.
    #[inline]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of internal (non-leaf) pages.
    #[inline]
    pub const fn branch_pages(&self) -> usize {
        self.branch_pages
    }

    /// Number of leaf pages.
    #[inline]
    pub const fn leaf_pages(&self) -> usize {
        self.leaf_pages
    }

    /// Number of overflow pages.
    #[inline]
    pub const fn overflow_pages(&self) -> usize {
        self.overflow_pages
    }

    /// Number of data items.
    #[inline]
    pub const fn entries(&self) -> usize {
        self.entries
    }
}

/// Environment information.
#[derive(Debug, Clone, Copy)]
pub struct Info {
    map_size: u64,
    data_size: u64,
    last_txnid: u64,
    num_readers: usize,
    max_readers: u32,
    mode: Mode,
}

impl Info {
    /// Size of the data file limit, in bytes.
    #[inline]
    pub const fn map_size(&self) -> u64 {
        self.map_size
    }

    /// Bytes currently used by the data file.
    #[inline]
    pub const fn data_size(&self) -> u64 {
        self.data_size
    }

    /// ID of the last committed transaction.
    #[inline]
    pub const fn last_txnid(&self) -> u64 {
        self.last_txnid
    }

    /// Number of active read transactions.
    #[inline]
    pub const fn num_readers(&self) -> usize {
        self.num_readers
    }

    /// Maximum number of concurrent read transactions.
    #[inline]
    pub const fn max_readers(&self) -> u32 {
        self.max_readers
    }

    /// Access mode of the environment.
    #[inline]
    pub const fn mode(&self) -> Mode {
        self.mode
    }
}

/// Options for opening or creating an environment.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentBuilder {
    flags: EnvironmentFlags,
    map_size: usize,
    page_size: usize,
    max_dbs: usize,
    max_readers: u32,
    admission: WriterAdmission,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self {
            flags: EnvironmentFlags::default(),
            map_size: DEFAULT_MAP_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            max_dbs: 0,
            max_readers: DEFAULT_MAX_READERS,
            admission: WriterAdmission::default(),
        }
    }
}

impl EnvironmentBuilder {
    /// Open an environment.
    ///
    /// The path is a directory unless [`EnvironmentFlags::no_sub_dir`] is
    /// set, in which case it names the data file. Directories are created in
    /// read-write mode.
    pub fn open(&self, path: &Path) -> KvResult<Environment> {
        self.validate()?;

        let read_only = matches!(self.flags.mode, Mode::ReadOnly);
        let file_path = if self.flags.no_sub_dir {
            path.to_path_buf()
        } else {
            if !read_only {
                std::fs::create_dir_all(path)?;
            }
            path.join(DATA_FILE)
        };

        let opened =
            DataFile::open(&file_path, self.page_size as u32, self.map_size as u64, read_only)?;
        let map_size = opened.file.map_size();
        let next_dbi = opened.snapshot.max_dbi() + 1;

        debug!(
            target: "kvdb",
            path = %path.display(),
            read_only,
            map_size,
            txn_id = opened.snapshot.txn_id,
            "opened environment"
        );

        let inner = EnvironmentInner {
            path: path.to_path_buf(),
            page_size: opened.page_size,
            max_dbs: self.max_dbs,
            max_readers: self.max_readers,
            mode: self.flags.mode,
            admission: self.admission,
            closed: AtomicBool::new(false),
            state: RwLock::new(Arc::new(opened.snapshot)),
            data: Mutex::new(Some(opened.file)),
            gate: WriterGate::default(),
            readers: AtomicUsize::new(0),
            next_dbi: AtomicU32::new(next_dbi),
        };
        Ok(Environment { inner: Arc::new(inner) })
    }

    fn validate(&self) -> KvResult<()> {
        let page_size = self.page_size;
        if !page_size.is_power_of_two()
            || !(MIN_PAGE_SIZE as usize..=MAX_PAGE_SIZE as usize).contains(&page_size)
        {
            return Err(KvError::InvalidConfig(format!(
                "page size {page_size} must be a power of two between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"
            )));
        }
        if self.map_size < page_size * 4 {
            return Err(KvError::InvalidConfig(format!(
                "map size {} must be at least four pages",
                self.map_size
            )));
        }
        if self.max_readers == 0 {
            return Err(KvError::InvalidConfig("max readers must be at least 1".into()));
        }
        Ok(())
    }

    /// Sets the provided options in the environment.
    pub fn set_flags(&mut self, flags: EnvironmentFlags) -> &mut Self {
        self.flags = flags;
        self
    }

    /// Sets the maximum size of the data file, in bytes.
    ///
    /// Commits that would grow the file beyond it fail with
    /// [`KvError::MapFull`]. An existing file larger than this raises the
    /// limit to its size.
    pub fn set_map_size(&mut self, map_size: usize) -> &mut Self {
        self.map_size = map_size;
        self
    }

    /// Sets the page size used for size limits and statistics of a new
    /// environment. Existing environments keep the page size they were
    /// created with.
    pub fn set_page_size(&mut self, page_size: usize) -> &mut Self {
        self.page_size = page_size;
        self
    }

    /// Sets the maximum number of threads or processes that can read
    /// concurrently.
    pub fn set_max_readers(&mut self, max_readers: u32) -> &mut Self {
        self.max_readers = max_readers;
        self
    }

    /// Sets the maximum number of named databases for the environment.
    ///
    /// This function is only needed if multiple databases will be used in
    /// the environment. Simpler applications that use the environment as a
    /// single unnamed database can ignore this option.
    pub fn set_max_dbs(&mut self, v: usize) -> &mut Self {
        self.max_dbs = v;
        self
    }

    /// Sets what happens when a write transaction is requested while another
    /// is active. Defaults to [`WriterAdmission::Block`].
    pub fn set_writer_admission(&mut self, admission: WriterAdmission) -> &mut Self {
        self.admission = admission;
        self
    }
}
