use super::{revisions, MigrationConfig, MigrationError};
use crate::{network::Network, storage::Transaction};

/// What the runner should do once a migration body returned successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The migration is complete. Its writes are committed together with the version bump.
    Done,
    /// The migration made progress but has more to do. Its writes are committed without touching the version,
    /// and it is called again with a new transaction.
    CallWithNewTransaction,
}

/// A schema change, applied by the runner with one or more transactions.
pub trait Migration {
    fn name(&self) -> &'static str;

    /// Called once before the first transaction of the migration.
    fn before(&mut self) {}

    fn migrate(&mut self, txn: &dyn Transaction, network: &Network) -> Result<MigrationOutcome, MigrationError>;
}

pub type MigrationBody = fn(&dyn Transaction, &Network) -> Result<MigrationOutcome, MigrationError>;

/// A stateless migration.
pub struct MigrationFn {
    name: &'static str,
    body: MigrationBody,
}

impl MigrationFn {
    pub const fn new(name: &'static str, body: MigrationBody) -> Self {
        Self { name, body }
    }
}

impl Migration for MigrationFn {
    fn name(&self) -> &'static str {
        self.name
    }

    fn migrate(&mut self, txn: &dyn Transaction, network: &Network) -> Result<MigrationOutcome, MigrationError> {
        (self.body)(txn, network)
    }
}

/// Every revision, in application order. Migration `i` moves the schema from version `i` to `i + 1`.
///
/// Append only: a released revision must never be reordered or removed.
pub fn get_migrations(config: &MigrationConfig) -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(MigrationFn::new("initial db should be empty", revisions::revision_0001::migrate)),
        Box::new(MigrationFn::new("relocate contract storage root keys", revisions::revision_0002::migrate)),
        Box::new(MigrationFn::new("recalculate events bloom filters", revisions::revision_0003::migrate)),
        Box::new(revisions::revision_0004::ChangeTrieNodeEncoding::new(config.trie_node_batch_size)),
        Box::new(revisions::revision_0005::CalculateBlockCommitments::new(config.commitment_workers())),
    ]
}
