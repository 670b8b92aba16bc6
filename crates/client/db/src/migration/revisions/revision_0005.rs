//! Migration from v4 to v5: store the transaction and event commitments of every block.
//!
//! Commitments are recomputed and checked against the block hash, which is CPU-bound and parallelized over a
//! thread pool. The transaction stays on the calling thread: it fetches the blocks in order and stores every
//! result. Workers only get owned blocks and send back the commitments.

use crate::{
    blockchain::{block_by_number, store_block_commitments, verify_block_hash, BlockCommitments, BlockHashMismatch},
    migration::{Migration, MigrationError, MigrationOutcome},
    network::Network,
    storage::Transaction,
};
use std::sync::mpsc;

type CommitmentsResult = Result<(u64, BlockCommitments), BlockHashMismatch>;

#[derive(Debug)]
pub struct CalculateBlockCommitments {
    workers: usize,
}

impl CalculateBlockCommitments {
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }
}

impl Migration for CalculateBlockCommitments {
    fn name(&self) -> &'static str {
        "calculate block commitments"
    }

    fn migrate(&mut self, txn: &dyn Transaction, network: &Network) -> Result<MigrationOutcome, MigrationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("block-commitments-{i}"))
            .build()?;
        let max_in_flight = 2 * self.workers;

        let (sender, receiver) = mpsc::channel::<CommitmentsResult>();
        let mut failure: Option<MigrationError> = None;
        let mut next_block = 0u64;
        let mut stored = 0u64;

        pool.in_place_scope(|scope| {
            let mut fetching = true;
            let mut in_flight = 0usize;

            while fetching || in_flight > 0 {
                if fetching && in_flight < max_in_flight {
                    match block_by_number(txn, next_block) {
                        Ok(Some(block)) => {
                            let sender = sender.clone();
                            scope.spawn(move |_| {
                                let res = verify_block_hash(&block, network).map(|c| (block.header.number, c));
                                // the receiver outlives the scope
                                let _ = sender.send(res);
                            });
                            in_flight += 1;
                            next_block += 1;
                        }
                        Ok(None) => fetching = false,
                        Err(err) => {
                            failure = Some(err.into());
                            fetching = false;
                        }
                    }
                    continue;
                }

                let Ok(res) = receiver.recv() else {
                    failure.get_or_insert_with(|| MigrationError::integrity("commitment worker stopped"));
                    break;
                };
                in_flight -= 1;
                match res {
                    Ok((block_n, commitments)) if failure.is_none() => {
                        match store_block_commitments(txn, block_n, &commitments) {
                            Ok(()) => stored += 1,
                            Err(err) => failure = Some(err.into()),
                        }
                    }
                    Ok(_) => {}
                    Err(mismatch) => {
                        failure.get_or_insert(mismatch.into());
                    }
                }
                if failure.is_some() {
                    fetching = false;
                }
            }
        });

        if let Some(err) = failure {
            return Err(err);
        }
        tracing::debug!("Stored commitments of {stored} blocks");
        Ok(MigrationOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blockchain::{block_commitments, store_block, store_block_header, tests::sample_chain},
        rocksdb::tests::temp_db,
        storage::{update, view},
    };
    use assert_matches::assert_matches;
    use rstest::rstest;
    use starknet_types_core::felt::Felt;

    #[rstest]
    #[case::single_worker(1)]
    #[case::four_workers(4)]
    fn test_commitments_match_sequential_computation(#[case] workers: usize) {
        let db = temp_db();
        let network = Network::Sepolia;
        let chain = sample_chain(40, &network);
        update(&*db, |txn| chain.iter().try_for_each(|block| store_block(txn, block))).unwrap();

        let mut migration = CalculateBlockCommitments::new(workers);
        let outcome = update(&*db, |txn| migration.migrate(txn, &network)).unwrap();
        assert_eq!(outcome, MigrationOutcome::Done);

        for block in &chain {
            let expected = BlockCommitments::compute(block);
            let stored = view(&*db, |txn| block_commitments(txn, block.header.number)).unwrap();
            assert_eq!(stored, Some(expected));
        }
        assert_eq!(view(&*db, |txn| block_commitments(txn, 40)).unwrap(), None);
    }

    #[test]
    fn test_empty_chain() {
        let db = temp_db();
        let mut migration = CalculateBlockCommitments::new(2);
        assert_eq!(update(&*db, |txn| migration.migrate(txn, &Network::Mainnet)).unwrap(), MigrationOutcome::Done);
    }

    #[test]
    fn test_hash_mismatch_fails() {
        let db = temp_db();
        let network = Network::Mainnet;
        let chain = sample_chain(12, &network);
        update(&*db, |txn| {
            chain.iter().try_for_each(|block| store_block(txn, block))?;
            let mut header = chain[7].header.clone();
            header.hash = Felt::from(0xbadu64);
            store_block_header(txn, &header)
        })
        .unwrap();

        let mut migration = CalculateBlockCommitments::new(3);
        let res = update(&*db, |txn| migration.migrate(txn, &network));
        assert_matches!(res, Err(MigrationError::BlockHash(BlockHashMismatch { block_number: 7, .. })));
        // discarded with the transaction
        assert_eq!(view(&*db, |txn| block_commitments(txn, 0)).unwrap(), None);
    }
}
