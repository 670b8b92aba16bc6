//! Madara client database.
//!
//! # Storage layout
//!
//! The database is a single ordered key space in a RocksDB optimistic transaction database. Logical tables are
//! [buckets](bucket::Bucket): every key starts with the one-byte tag of its bucket. Everything above the store goes
//! through the [`storage`] traits, so that a migration only ever sees a [`Transaction`].
//!
//! # Schema migrations
//!
//! On startup, call [`MigrationRunner::run_migrations`] before anything else reads the database. It brings an
//! older database to the layout this binary expects, and refuses to open a database written by a newer binary.
//!
//! ```ignore
//! let db = RocksDBStorage::open(path, &RocksDBConfig::default())?;
//! MigrationRunner::new(&MigrationConfig::default()).run_migrations(&db, &Network::Mainnet)?;
//! ```

pub mod blockchain;
pub mod bucket;
mod error;
pub mod migration;
pub mod network;
pub mod rocksdb;
pub mod storage;
pub mod trie;

pub use bucket::{Bucket, DbKey};
pub use error::DbError;
pub use migration::{MigrationConfig, MigrationError, MigrationRunner, MigrationStatus};
pub use network::Network;
pub use crate::rocksdb::{RocksDBConfig, RocksDBStorage};
pub use storage::{update, view, Database, DbIterator, Transaction};
