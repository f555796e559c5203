//! The environment and its on-disk storage.

mod environment;
pub use environment::{
    DEFAULT_MAP_SIZE, DEFAULT_MAX_READERS, DEFAULT_PAGE_SIZE, Environment, EnvironmentBuilder,
    Info, Stat,
};

pub(crate) mod storage;

pub(crate) mod txn_manager;
