//! Migration from v2 to v3: recompute the events bloom filter of every block header.

use crate::{
    blockchain::{block_by_number, store_block_header, EventsBloom},
    migration::{MigrationError, MigrationOutcome},
    network::Network,
    storage::Transaction,
};

pub fn migrate(txn: &dyn Transaction, _network: &Network) -> Result<MigrationOutcome, MigrationError> {
    let mut block_n = 0;
    while let Some(mut block) = block_by_number(txn, block_n)? {
        block.header.events_bloom = EventsBloom::from_receipts(&block.receipts);
        store_block_header(txn, &block.header)?;
        block_n += 1;
    }
    tracing::debug!("Recalculated events bloom of {block_n} blocks");
    Ok(MigrationOutcome::Done)
}
