//! Transaction management and access.
//!
//! # Core Types (re-exported at crate root)
//!
//! - [`Tx`] - A read-only or read-write transaction
//! - [`Cursor`] - Database cursor for navigating entries
//! - [`Database`] - Handle to an opened database
//! - [`Ro`], [`Rw`] - Transaction kind markers
//!
//! # Type Aliases
//!
//! Convenience aliases for common transaction/cursor/iterator configurations
//! are available in [`aliases`]:
//! - [`aliases::RoTx`], [`aliases::RwTx`] - Transactions
//! - [`aliases::RoCursor`], [`aliases::RwCursor`] - Cursors
//!
//! # Writing Generic Code
//!
//! Methods available to every transaction are bounded on
//! [`TransactionKind`]; mutating methods additionally require
//! [`WriteMarker`], which only [`Rw`] implements.

mod assertions;

pub mod aliases;

pub(crate) mod cache;

mod cursor;
pub use cursor::Cursor;

mod database;
pub use database::Database;

pub mod iter;

mod kind;
pub use kind::{Ro, Rw, TransactionKind, WriteMarker};

pub(crate) mod layer;

/// Cursor operation codes and the read path over pending writes.
pub mod ops;

mod r#impl;
pub use r#impl::Tx;
