//! Safe access to database entries.
//!
//! This module provides abstractions for working with database entries,
//! including deserialization via the [`TableObject`] trait and checked
//! views of borrowed data through [`TxView`].
mod codec;
pub use codec::{ObjectLength, TableObject, TableObjectOwned};

mod view;
pub use view::TxView;

