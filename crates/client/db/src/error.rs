use std::borrow::Cow;

/// Failure of the underlying key-value store.
#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("Rocksdb error: {0:#}")]
    RocksDB(#[from] rocksdb::Error),
    #[error("Value codec error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Attempted to write using a read-only transaction")]
    ReadOnlyTransaction,
    #[error("Iterator is not positioned on an entry")]
    IteratorNotPositioned,
    #[error("Format error: `{0}`")]
    Format(Cow<'static, str>),
}
