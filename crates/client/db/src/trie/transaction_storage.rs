use super::{is_compact_encoding, legacy, write_path, Node, NodeCodecError, TriePathSlice};
use crate::{bucket::DbKey, error::DbError, storage::Transaction};

#[derive(thiserror::Error, Debug)]
pub enum TrieError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Malformed trie node: {0}")]
    Codec(#[from] NodeCodecError),
    #[error("Malformed legacy trie node: {0}")]
    LegacyCodec(#[from] legacy::LegacyDecodeError),
}

/// Trie nodes of one trie, stored inside a transaction under `prefix ‖ path`.
///
/// Nodes are written in the compact layout. Reads also accept the legacy layout so that a trie can be read
/// while its bucket is being rewritten.
pub struct TransactionStorage<'t> {
    txn: &'t dyn Transaction,
    prefix: DbKey,
}

impl<'t> TransactionStorage<'t> {
    pub fn new(txn: &'t dyn Transaction, prefix: impl Into<DbKey>) -> Self {
        Self { txn, prefix: prefix.into() }
    }

    fn db_key(&self, path: &TriePathSlice) -> Result<DbKey, NodeCodecError> {
        let mut key = Vec::with_capacity(self.prefix.len() + 1 + path.len().div_ceil(8));
        key.extend_from_slice(&self.prefix);
        write_path(path, &mut key)?;
        Ok(key.into())
    }

    #[tracing::instrument(skip(self, node), fields(prefix = ?self.prefix))]
    pub fn put(&self, path: &TriePathSlice, node: &Node) -> Result<(), TrieError> {
        let key = self.db_key(path)?;
        tracing::trace!("Put trie node {key:?}");
        self.txn.set(&key, &node.encode()?)?;
        Ok(())
    }

    /// Returns `None` when no node is stored at `path`.
    #[tracing::instrument(skip(self), fields(prefix = ?self.prefix))]
    pub fn get(&self, path: &TriePathSlice) -> Result<Option<Node>, TrieError> {
        let key = self.db_key(path)?;
        tracing::trace!("Get trie node {key:?}");
        let Some(bytes) = self.txn.get(&key)? else { return Ok(None) };
        if is_compact_encoding(&bytes) {
            Ok(Some(Node::decode(&bytes)?))
        } else {
            Ok(Some(legacy::decode_legacy(&bytes)?))
        }
    }

    #[tracing::instrument(skip(self), fields(prefix = ?self.prefix))]
    pub fn delete(&self, path: &TriePathSlice) -> Result<(), TrieError> {
        let key = self.db_key(path)?;
        tracing::trace!("Delete trie node {key:?}");
        self.txn.delete(&key)?;
        Ok(())
    }
}
