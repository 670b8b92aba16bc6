//! Migration from v1 to v2: contract storage root pointers move next to the contract storage trie nodes.
//!
//! `Unused ‖ address` → `ContractStorage ‖ address`

use crate::{
    bucket::Bucket,
    migration::{MigrationError, MigrationOutcome},
    network::Network,
    storage::{scan_prefix, Transaction},
};

pub fn migrate(txn: &dyn Transaction, _network: &Network) -> Result<MigrationOutcome, MigrationError> {
    let old_prefix = Bucket::Unused.prefix();
    // all the entries are read before the first write, the iterator is closed by then
    let entries = scan_prefix(txn, &old_prefix)?;
    tracing::debug!("Relocating {} contract storage root keys", entries.len());

    for (key, value) in entries {
        let address = key.strip_prefix(&old_prefix[..]).ok_or_else(|| MigrationError::integrity("prefix not found"))?;
        txn.set(&Bucket::ContractStorage.key(&[address]), &value)?;
        txn.delete(&key)?;
    }
    Ok(MigrationOutcome::Done)
}
