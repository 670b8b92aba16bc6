use super::{Block, BlockCommitments, Event, EventsBloom, Header, Receipt, TransactionRecord};
use crate::network::Network;
use starknet_types_core::{
    felt::Felt,
    hash::{Pedersen, Poseidon, StarkHash},
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Block #{block_number} hash mismatch: stored {stored:#x}, computed {computed:#x}")]
pub struct BlockHashMismatch {
    pub block_number: u64,
    pub stored: Felt,
    pub computed: Felt,
}

impl Event {
    pub fn compute_hash(&self) -> Felt {
        let keys_hash = Pedersen::hash_array(&self.keys);
        let data_hash = Pedersen::hash_array(&self.data);
        Pedersen::hash_array(&[self.from_address, keys_hash, data_hash])
    }
}

/// Poseidon over the transaction hashes, zero for an empty block.
pub fn transaction_commitment(transactions: &[TransactionRecord]) -> Felt {
    if transactions.is_empty() {
        return Felt::ZERO;
    }
    let hashes: Vec<Felt> = transactions.iter().map(|tx| tx.hash).collect();
    Poseidon::hash_array(&hashes)
}

/// Poseidon over the event hashes of every receipt, zero when the block emitted no event.
pub fn event_commitment(receipts: &[Receipt]) -> Felt {
    let hashes: Vec<Felt> = receipts.iter().flat_map(|receipt| &receipt.events).map(Event::compute_hash).collect();
    if hashes.is_empty() {
        return Felt::ZERO;
    }
    Poseidon::hash_array(&hashes)
}

impl BlockCommitments {
    pub fn compute(block: &Block) -> Self {
        Self {
            transaction_commitment: transaction_commitment(&block.transactions),
            event_commitment: event_commitment(&block.receipts),
        }
    }
}

impl Header {
    pub fn compute_hash(&self, commitments: &BlockCommitments, chain_id: Felt) -> Felt {
        Pedersen::hash_array(&[
            Felt::from(self.number),
            self.parent_hash,
            self.sequencer_address,
            Felt::from(self.timestamp),
            Felt::from(self.transaction_count),
            commitments.transaction_commitment,
            Felt::from(self.event_count),
            commitments.event_commitment,
            chain_id,
        ])
    }
}

impl Block {
    /// Fill in the derived header fields: counts, events bloom and block hash.
    pub fn seal(mut self, network: &Network) -> Self {
        self.header.transaction_count = self.transactions.len() as u64;
        self.header.event_count = self.receipts.iter().map(|receipt| receipt.events.len() as u64).sum();
        self.header.events_bloom = EventsBloom::from_receipts(&self.receipts);
        self.header.hash = self.header.compute_hash(&BlockCommitments::compute(&self), network.chain_id());
        self
    }
}

/// Recompute the commitments of `block` and check them against its stored hash.
pub fn verify_block_hash(block: &Block, network: &Network) -> Result<BlockCommitments, BlockHashMismatch> {
    let commitments = BlockCommitments::compute(block);
    let computed = block.header.compute_hash(&commitments, network.chain_id());
    if computed != block.header.hash {
        return Err(BlockHashMismatch { block_number: block.header.number, stored: block.header.hash, computed });
    }
    Ok(commitments)
}
