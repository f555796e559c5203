//! Committed state and its on-disk commit log.
//!
//! The committed contents of every database live in memory as an immutable
//! [`Snapshot`]. Readers clone the `Arc` and are never disturbed by later
//! commits. Every top-level commit appends one checksummed record to the
//! data file; opening an environment replays the records.
//!
//! # File layout
//!
//! ```text
//! header:  magic (8) | page_size u32 | reserved u32
//! record:  payload_len u32 | crc32(payload) u32 | payload
//! ```
//!
//! All integers are little-endian.

use crate::{
    DatabaseFlags, KvError, KvResult, SyncMode,
    tx::layer::{Layer, TableLayer},
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fs2::FileExt;
use memmap2::Mmap;
use smallvec::SmallVec;
use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};
use tracing::{debug, warn};

/// Database identifier within an environment.
pub(crate) type Dbi = u32;

/// Identifier of the unnamed main database.
pub(crate) const MAIN_DBI: Dbi = 1;

/// Sorted, non-empty list of values stored under one key.
pub(crate) type Dups = SmallVec<[Vec<u8>; 1]>;

/// Contents of a single database.
///
/// A persistent map: clones share structure, so snapshots and write layers
/// copy tables in constant time.
pub(crate) type Table = im::OrdMap<Vec<u8>, Dups>;

/// Name of the data file inside an environment directory.
pub(crate) const DATA_FILE: &str = "data.kv";

const MAGIC: &[u8; 8] = b"SKVDB\0\0\x01";

/// Smallest supported page size.
pub(crate) const MIN_PAGE_SIZE: u32 = 256;
/// Largest supported page size.
pub(crate) const MAX_PAGE_SIZE: u32 = 65536;
const HEADER_LEN: u64 = 16;
const RECORD_HEADER_LEN: usize = 8;

/// Registry entry for a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DbRecord {
    pub(crate) name: Option<String>,
    pub(crate) flags: DatabaseFlags,
}

impl DbRecord {
    pub(crate) const fn main() -> Self {
        Self { name: None, flags: DatabaseFlags::empty() }
    }
}

/// An immutable view of all committed databases.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) txn_id: u64,
    pub(crate) dbs: BTreeMap<Dbi, DbRecord>,
    pub(crate) tables: BTreeMap<Dbi, Table>,
}

impl Default for Snapshot {
    fn default() -> Self {
        let mut dbs = BTreeMap::new();
        dbs.insert(MAIN_DBI, DbRecord::main());
        Self { txn_id: 0, dbs, tables: BTreeMap::new() }
    }
}

impl Snapshot {
    /// Highest database identifier in use.
    pub(crate) fn max_dbi(&self) -> Dbi {
        self.dbs.keys().next_back().copied().unwrap_or(MAIN_DBI)
    }
}

/// Result of opening a data file.
#[derive(Debug)]
pub(crate) struct Opened {
    pub(crate) file: DataFile,
    pub(crate) snapshot: Snapshot,
    pub(crate) page_size: u32,
}

/// Append-only commit log backing an environment.
#[derive(Debug)]
pub(crate) struct DataFile {
    file: File,
    len: u64,
    map_size: u64,
    read_only: bool,
    dirty: bool,
}

impl DataFile {
    /// Opens or creates the data file at `path`, replaying its records.
    ///
    /// A writable file is locked exclusively and a read-only one shared, for
    /// as long as the returned handle lives. Fails with [`KvError::Locked`]
    /// if another environment holds a conflicting lock.
    pub(crate) fn open(
        path: &Path,
        page_size: u32,
        map_size: u64,
        read_only: bool,
    ) -> KvResult<Opened> {
        let mut file = if read_only {
            File::open(path)?
        } else {
            OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?
        };
        let locked =
            if read_only { FileExt::try_lock_shared(&file) } else { FileExt::try_lock_exclusive(&file) };
        if let Err(err) = locked {
            if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(KvError::Locked);
            }
            return Err(err.into());
        }
        let len = file.metadata()?.len();

        if len == 0 {
            if !read_only {
                let mut header = Vec::with_capacity(HEADER_LEN as usize);
                header.extend_from_slice(MAGIC);
                header.write_u32::<LittleEndian>(page_size)?;
                header.write_u32::<LittleEndian>(0)?;
                file.write_all(&header)?;
                file.sync_all()?;
            }
            let len = if read_only { 0 } else { HEADER_LEN };
            let file = Self { file, len, map_size, read_only, dirty: false };
            return Ok(Opened { file, snapshot: Snapshot::default(), page_size });
        }

        // SAFETY: the map is read-only and dropped before the file is
        // modified. Concurrent modification by other processes is not
        // supported.
        let map = unsafe { Mmap::map(&file)? };
        let (snapshot, stored_page_size, valid_len) = replay(&map)?;
        drop(map);

        if valid_len < len {
            warn!(
                target: "kvdb",
                valid_len,
                file_len = len,
                "Discarding incomplete or damaged commit records at end of data file."
            );
            if !read_only {
                file.set_len(valid_len)?;
                file.sync_all()?;
            }
        }

        debug!(
            target: "kvdb",
            txn_id = snapshot.txn_id,
            dbs = snapshot.dbs.len(),
            bytes = valid_len,
            "replayed data file"
        );

        let map_size = map_size.max(valid_len);
        let file = Self { file, len: valid_len, map_size, read_only, dirty: false };
        Ok(Opened { file, snapshot, page_size: stored_page_size })
    }

    /// Current size of the valid portion of the file.
    pub(crate) const fn len(&self) -> u64 {
        self.len
    }

    /// Effective map size, never less than the file size.
    pub(crate) const fn map_size(&self) -> u64 {
        self.map_size
    }

    /// Appends a commit record for `layer`, returning the number of bytes
    /// written.
    pub(crate) fn append(&mut self, txn_id: u64, layer: &Layer, mode: SyncMode) -> KvResult<u64> {
        if self.read_only {
            return Err(KvError::Readonly);
        }

        let payload = encode_layer(txn_id, layer)?;
        let payload_len = u32::try_from(payload.len()).map_err(|_| KvError::MapFull)?;
        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
        record.write_u32::<LittleEndian>(payload_len)?;
        record.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
        record.extend_from_slice(&payload);

        let written = record.len() as u64;
        if self.len + written > self.map_size {
            return Err(KvError::MapFull);
        }

        self.file.seek(SeekFrom::Start(self.len))?;
        if let Err(err) = self.file.write_all(&record) {
            // Best effort: drop the partial record so the next append lines up.
            let _ = self.file.set_len(self.len);
            return Err(err.into());
        }
        self.len += written;

        match mode {
            SyncMode::Durable => self.file.sync_all()?,
            SyncMode::NoMetaSync => self.file.sync_data()?,
            SyncMode::SafeNoSync | SyncMode::UtterlyNoSync => self.dirty = true,
        }

        Ok(written)
    }

    /// Flushes deferred writes. With `force`, flushes even if nothing is
    /// pending.
    pub(crate) fn sync(&mut self, force: bool) -> KvResult<()> {
        if self.read_only {
            return Ok(());
        }
        if self.dirty || force {
            self.file.sync_all()?;
            self.dirty = false;
        }
        Ok(())
    }
}

/// Replays all intact records, returning the resulting snapshot, the stored
/// page size and the length of the valid prefix of the file.
fn replay(data: &[u8]) -> KvResult<(Snapshot, u32, u64)> {
    if data.len() < HEADER_LEN as usize || &data[..MAGIC.len()] != MAGIC {
        return Err(KvError::Corrupted);
    }
    let mut header = &data[MAGIC.len()..HEADER_LEN as usize];
    let page_size = header.read_u32::<LittleEndian>()?;
    if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(KvError::Corrupted);
    }

    let mut snapshot = Snapshot::default();
    let mut offset = HEADER_LEN as usize;

    while let Some(mut record_header) = data.get(offset..offset + RECORD_HEADER_LEN) {
        let payload_len = record_header.read_u32::<LittleEndian>()? as usize;
        let checksum = record_header.read_u32::<LittleEndian>()?;
        let start = offset + RECORD_HEADER_LEN;
        let Some(payload) = data.get(start..start + payload_len) else { break };
        if crc32fast::hash(payload) != checksum {
            break;
        }
        let Ok((txn_id, layer)) = decode_layer(payload) else { break };
        layer.apply_to(&mut snapshot);
        snapshot.txn_id = txn_id;
        offset = start + payload_len;
    }

    Ok((snapshot, page_size, offset as u64))
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> io::Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "item too large"))?;
    out.write_u32::<LittleEndian>(len)?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn read_bytes(input: &mut &[u8]) -> io::Result<Vec<u8>> {
    let len = input.read_u32::<LittleEndian>()? as usize;
    if len > input.len() {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    let mut buf = vec![0; len];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serializes the changes in `layer` as a commit record payload.
pub(crate) fn encode_layer(txn_id: u64, layer: &Layer) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(txn_id)?;

    out.write_u32::<LittleEndian>(layer.dbs.len() as u32)?;
    for (dbi, record) in &layer.dbs {
        out.write_u32::<LittleEndian>(*dbi)?;
        match record {
            None => out.write_u8(0)?,
            Some(record) => {
                out.write_u8(1)?;
                out.write_u32::<LittleEndian>(record.flags.bits())?;
                match &record.name {
                    None => out.write_u8(0)?,
                    Some(name) => {
                        out.write_u8(1)?;
                        write_bytes(&mut out, name.as_bytes())?;
                    }
                }
            }
        }
    }

    out.write_u32::<LittleEndian>(layer.tables.len() as u32)?;
    for (dbi, table) in &layer.tables {
        out.write_u32::<LittleEndian>(*dbi)?;
        out.write_u8(table.cleared as u8)?;
        out.write_u32::<LittleEndian>(table.entries.len() as u32)?;
        for (key, dups) in &table.entries {
            write_bytes(&mut out, key)?;
            match dups {
                None => out.write_u8(0)?,
                Some(dups) => {
                    out.write_u8(1)?;
                    out.write_u32::<LittleEndian>(dups.len() as u32)?;
                    for value in dups {
                        write_bytes(&mut out, value)?;
                    }
                }
            }
        }
    }

    Ok(out)
}

/// Parses a commit record payload.
pub(crate) fn decode_layer(mut input: &[u8]) -> io::Result<(u64, Layer)> {
    let input = &mut input;
    let txn_id = input.read_u64::<LittleEndian>()?;
    let mut layer = Layer::default();

    for _ in 0..input.read_u32::<LittleEndian>()? {
        let dbi = input.read_u32::<LittleEndian>()?;
        let record = match input.read_u8()? {
            0 => None,
            _ => {
                let flags = DatabaseFlags::from_bits_truncate(input.read_u32::<LittleEndian>()?);
                let name = match input.read_u8()? {
                    0 => None,
                    _ => Some(
                        String::from_utf8(read_bytes(input)?)
                            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?,
                    ),
                };
                Some(DbRecord { name, flags })
            }
        };
        layer.dbs.insert(dbi, record);
    }

    for _ in 0..input.read_u32::<LittleEndian>()? {
        let dbi = input.read_u32::<LittleEndian>()?;
        let cleared = input.read_u8()? != 0;
        let mut table = TableLayer { cleared, ..TableLayer::default() };
        for _ in 0..input.read_u32::<LittleEndian>()? {
            let key = read_bytes(input)?;
            let dups = match input.read_u8()? {
                0 => None,
                _ => {
                    let count = input.read_u32::<LittleEndian>()? as usize;
                    let mut dups = Dups::with_capacity(count.min(input.len()));
                    for _ in 0..count {
                        dups.push(read_bytes(input)?);
                    }
                    Some(dups)
                }
            };
            table.entries.insert(key, dups);
        }
        layer.tables.insert(dbi, table);
    }

    if !input.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "trailing bytes in record"));
    }
    Ok((txn_id, layer))
}
