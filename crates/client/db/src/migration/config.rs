use std::num::NonZeroUsize;

/// Entries rewritten per transaction by the trie node encoding migration.
pub const DEFAULT_TRIE_NODE_BATCH_SIZE: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Upper bound on the writes queued in one transaction by batched migrations. Lower it on memory
    /// constrained machines.
    pub trie_node_batch_size: usize,
    /// Worker threads used to compute block commitments. Defaults to the available parallelism.
    pub commitment_workers: Option<usize>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { trie_node_batch_size: DEFAULT_TRIE_NODE_BATCH_SIZE, commitment_workers: None }
    }
}

impl MigrationConfig {
    pub fn commitment_workers(&self) -> usize {
        self.commitment_workers
            .and_then(NonZeroUsize::new)
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }
}
