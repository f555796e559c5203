//! Utility functions for benchmarks.
#![allow(dead_code, unreachable_pub)]

use signet_kvdb::{
    DatabaseFlags, Environment, WriteFlags,
    tx::aliases::{RoTx, RwTx},
};
use tempfile::{TempDir, tempdir};

/// Name of the named benchmark database.
pub const NAMED_DB: &str = "named_benchmark_db";

/// Name of the duplicate-sorted benchmark database.
pub const DUP_DB: &str = "dup_benchmark_db";

/// Generate a DB key string for testing.
pub fn get_key(n: u32) -> String {
    format!("key{n}")
}

// Generate a DB data string for testing.
pub fn get_data(n: u32) -> String {
    format!("data{n}")
}

/// Create a read-only transaction.
pub fn create_ro(env: &Environment) -> RoTx {
    env.begin_ro_txn().unwrap()
}

/// Create a read-write transaction.
pub fn create_rw(env: &Environment) -> RwTx {
    env.begin_rw_txn().unwrap()
}

/// Create a temporary benchmark database with the specified number of rows.
///
/// The main and the named database hold `num_rows` rows each. The
/// duplicate-sorted database holds `num_rows` values spread over ten keys.
pub fn setup_bench_db(num_rows: u32) -> (TempDir, Environment) {
    let dir = tempdir().unwrap();
    let env = Environment::builder().set_max_dbs(2).open(dir.path()).unwrap();

    {
        let txn = env.begin_rw_txn().unwrap();
        let db = txn.open_db(None).unwrap();
        for i in 0..num_rows {
            txn.put(db, get_key(i), get_data(i), WriteFlags::empty()).unwrap();
        }

        let named_db = txn.create_db(Some(NAMED_DB), Default::default()).unwrap();
        for i in 0..num_rows {
            txn.put(named_db, get_key(i), get_data(i), WriteFlags::empty()).unwrap();
        }

        let dup_db = txn.create_db(Some(DUP_DB), DatabaseFlags::DUP_SORT).unwrap();
        for i in 0..num_rows {
            txn.put(dup_db, get_key(i % 10), get_data(i), WriteFlags::empty()).unwrap();
        }
        txn.commit().unwrap();
    }
    (dir, env)
}
