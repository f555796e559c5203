//! An embedded, ordered, transactional key-value store.
//!
//! # Overview
//!
//! This crate stores sorted key-value pairs in named databases inside a
//! single environment directory, and provides:
//! - Isolated read-only transactions over immutable snapshots
//! - A single writer at a time, with nested transactions that can be rolled
//!   back independently
//! - Cursors for positioned access, mutation and lazy iteration
//! - Sorted duplicate values per key ([`DatabaseFlags::DUP_SORT`])
//! - Custom deserialization via the [`TableObject`] trait
//!
//! # Quick Start
//!
//! ```
//! use signet_kvdb::{DatabaseFlags, Environment, KvResult, WriteFlags};
//!
//! fn main() -> KvResult<()> {
//!     # let dir = tempfile::tempdir().unwrap();
//!     # let path = dir.path();
//!     // Open an environment (creates directory if needed)
//!     let env = Environment::builder().set_map_size(1 << 30).open(path)?;
//!
//!     // Write data in a read-write transaction
//!     let txn = env.begin_rw_txn()?;
//!     let db = txn.create_db(None, DatabaseFlags::empty())?;
//!     txn.put(db, b"hello", b"world", WriteFlags::empty())?;
//!     txn.commit()?;
//!
//!     // Read data in a read-only transaction
//!     let txn = env.begin_ro_txn()?;
//!     let db = txn.open_db(None)?;
//!     let value: Option<Vec<u8>> = txn.get(db, b"hello").expect("read failed");
//!     assert_eq!(value.as_deref(), Some(b"world".as_slice()));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! - [`Environment`] - A directory containing one or more databases. Created
//!   via [`Environment::builder()`].
//! - [`Tx`] - A transaction. [`Ro`] and [`Rw`] mark read-only and read-write
//!   transactions; writes only compile for [`Rw`].
//! - [`Database`] - A named or unnamed key-value store within an environment.
//!   - Opened with [`Tx::open_db()`].
//!   - Created with [`Tx::create_db()`].
//! - [`Cursor`]: Enables iteration and positioned access within a database.
//!   Created via [`Tx::cursor()`].
//!
//! # Borrowed vs Copied Reads
//!
//! Reads decode into any [`TableObject`]. `Cow<'tx, [u8]>` borrows committed
//! data directly from the transaction's snapshot, and copies data the
//! transaction wrote itself. [`Vec<u8>`] always copies. The borrow checker
//! keeps borrowed data from outliving its transaction; [`TxView`] adds a
//! runtime check against environment close.
//!
//! ```
//! # use std::borrow::Cow;
//! use signet_kvdb::{KvError, ReadResult, TableObject};
//!
//! struct MyKey([u8; 32]);
//!
//! impl TableObject<'_> for MyKey {
//!     fn decode_borrow(data: Cow<'_, [u8]>) -> ReadResult<Self> {
//!         let arr: [u8; 32] =
//!             data.as_ref().try_into().map_err(|_| KvError::DecodeErrorLenDiff)?;
//!         Ok(Self(arr))
//!     }
//! }
//! ```
//!
//! # Imports
//!
//! For most use cases, import from the crate root:
//! ```rust,ignore
//! use signet_kvdb::{Environment, DatabaseFlags, WriteFlags, KvResult};
//! ```
//!
//! For advanced usage, import from submodules:
//! - [`tx::aliases`] - Transaction, cursor and iterator type aliases
//! - [`tx::iter`] - Iterator types for cursor iteration
//! - [`sys`] - Environment defaults

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod entries;
pub use entries::{ObjectLength, TableObject, TableObjectOwned, TxView};

mod error;
pub use error::{ErrorKind, KvError, KvResult, ReadError, ReadResult};

mod flags;
pub use flags::{
    DatabaseFlags, EnvironmentFlags, Mode, SyncMode, WriteFlags, WriterAdmission,
};

pub mod sys;
pub use sys::{Environment, EnvironmentBuilder, Info, Stat};

pub mod tx;
pub use tx::{
    Cursor, Database, Ro, Rw, TransactionKind, Tx, WriteMarker,
    iter::DupItem,
};
