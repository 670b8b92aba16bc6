use crate::{
    error::DbError,
    rocksdb::options::rocksdb_global_options,
    storage::{Database, DbIterator, Transaction},
};
use rocksdb::{DBRawIteratorWithThreadMode, MultiThreaded, OptimisticTransactionDB};
use std::{fmt, path::Path};

mod options;

pub use options::{RocksDBConfig, StatsLevel};

type DB = OptimisticTransactionDB<MultiThreaded>;
type RocksDBTransactionInner<'db> = rocksdb::Transaction<'db, DB>;

/// Implementation of the [`Database`] interface using rocksdb.
///
/// The whole key space lives in the default column family: buckets are key prefixes, see [`crate::bucket`].
pub struct RocksDBStorage {
    db: DB,
    config: RocksDBConfig,
}

impl fmt::Debug for RocksDBStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksDBStorage").field("config", &self.config).finish()
    }
}

impl RocksDBStorage {
    pub fn open(path: &Path, config: &RocksDBConfig) -> Result<Self, DbError> {
        let opts = rocksdb_global_options(config)?;
        tracing::debug!("Opening db at {:?}", path.display());
        let db = DB::open(&opts, path)?;
        Ok(Self { db, config: config.clone() })
    }
}

impl Database for RocksDBStorage {
    fn new_transaction(&self, writable: bool) -> Result<Box<dyn Transaction + '_>, DbError> {
        Ok(Box::new(RocksDBTransaction { inner: self.db.transaction(), writable }))
    }
}

struct RocksDBTransaction<'db> {
    inner: RocksDBTransactionInner<'db>,
    writable: bool,
}

impl Transaction for RocksDBTransaction<'_> {
    #[tracing::instrument(skip(self, key))]
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError> {
        Ok(self.inner.get(key)?)
    }

    #[tracing::instrument(skip(self, key, value))]
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), DbError> {
        if !self.writable {
            return Err(DbError::ReadOnlyTransaction);
        }
        Ok(self.inner.put(key, value)?)
    }

    #[tracing::instrument(skip(self, key))]
    fn delete(&self, key: &[u8]) -> Result<(), DbError> {
        if !self.writable {
            return Err(DbError::ReadOnlyTransaction);
        }
        Ok(self.inner.delete(key)?)
    }

    fn new_iterator(&self) -> Result<Box<dyn DbIterator + '_>, DbError> {
        Ok(Box::new(RocksDBIterator { inner: self.inner.raw_iterator(), positioned: false }))
    }

    fn commit(self: Box<Self>) -> Result<(), DbError> {
        if !self.writable {
            return Ok(self.inner.rollback()?);
        }
        Ok(self.inner.commit()?)
    }

    fn discard(self: Box<Self>) -> Result<(), DbError> {
        Ok(self.inner.rollback()?)
    }
}

struct RocksDBIterator<'t, 'db> {
    inner: DBRawIteratorWithThreadMode<'t, RocksDBTransactionInner<'db>>,
    /// Raw iterators must not be advanced before being positioned.
    positioned: bool,
}

impl DbIterator for RocksDBIterator<'_, '_> {
    fn seek(&mut self, key: &[u8]) {
        self.inner.seek(key);
        self.positioned = true;
    }

    fn valid(&self) -> bool {
        self.positioned && self.inner.valid()
    }

    fn next(&mut self) -> bool {
        if !self.positioned {
            self.inner.seek_to_first();
            self.positioned = true;
        } else if self.inner.valid() {
            self.inner.next();
        }
        self.inner.valid()
    }

    fn key(&self) -> Option<&[u8]> {
        if !self.valid() {
            return None;
        }
        self.inner.key()
    }

    fn value(&self) -> Result<&[u8], DbError> {
        if !self.valid() {
            return Err(DbError::IteratorNotPositioned);
        }
        self.inner.value().ok_or(DbError::IteratorNotPositioned)
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        Ok(self.inner.status()?)
    }
}
