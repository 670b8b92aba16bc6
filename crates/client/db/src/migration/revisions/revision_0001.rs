//! Migration from v0 to v1: a database without schema version must be empty.

use crate::{
    migration::{MigrationError, MigrationOutcome},
    network::Network,
    storage::Transaction,
};

pub fn migrate(txn: &dyn Transaction, _network: &Network) -> Result<MigrationOutcome, MigrationError> {
    let mut it = txn.new_iterator()?;
    let has_entries = it.next();
    it.close()?;

    if has_entries {
        return Err(MigrationError::integrity("initial DB should be empty"));
    }
    Ok(MigrationOutcome::Done)
}
