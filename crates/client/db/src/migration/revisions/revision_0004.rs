//! Migration from v3 to v4: trie nodes move from the generic value codec to the compact node layout.
//!
//! Every node of the class trie, the global state trie and the contract storage tries is rewritten, in batches of
//! at most `batch_size` nodes per transaction. Root pointers share the buckets and are left untouched. Nodes
//! already in the compact layout are skipped, which makes a replay after a crash pick up where it stopped.

use crate::{
    bucket::Bucket,
    migration::{batch::ResumableRewriter, Migration, MigrationError, MigrationOutcome},
    network::Network,
    storage::Transaction,
    trie::{is_compact_encoding, legacy::decode_legacy},
};

const ADDRESS_LEN: usize = 32;

/// Trie buckets with the length of their root pointer keys.
const TRIE_BUCKETS: [(Bucket, usize); 3] =
    [(Bucket::ClassesTrie, 1), (Bucket::StateTrie, 1), (Bucket::ContractStorage, 1 + ADDRESS_LEN)];

#[derive(Debug)]
pub struct ChangeTrieNodeEncoding {
    batch_size: usize,
    rewriter: Option<ResumableRewriter>,
}

impl ChangeTrieNodeEncoding {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size, rewriter: None }
    }
}

fn convert_node(_key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>, MigrationError> {
    if is_compact_encoding(value) {
        return Ok(None);
    }
    Ok(Some(decode_legacy(value)?.encode()?))
}

impl Migration for ChangeTrieNodeEncoding {
    fn name(&self) -> &'static str {
        "change trie node encoding"
    }

    fn before(&mut self) {
        self.rewriter = Some(ResumableRewriter::new(TRIE_BUCKETS, self.batch_size));
    }

    fn migrate(&mut self, txn: &dyn Transaction, _network: &Network) -> Result<MigrationOutcome, MigrationError> {
        let batch_size = self.batch_size;
        let rewriter = self.rewriter.get_or_insert_with(|| ResumableRewriter::new(TRIE_BUCKETS, batch_size));
        rewriter.rewrite(txn, convert_node)
    }
}
