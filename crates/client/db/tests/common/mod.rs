#![allow(dead_code)]

use mc_db::{
    blockchain::{store_block, Block, Event, Header, Receipt, TransactionRecord},
    storage::scan_prefix,
    trie::{legacy::encode_legacy, write_path, Node, TriePath},
    update, view, Bucket, MigrationError, Network, RocksDBConfig, RocksDBStorage,
};
use starknet_types_core::felt::Felt;
use std::{ops::Deref, path::Path};
use tempfile::TempDir;

pub struct TempDb {
    db: RocksDBStorage,
    _dir: TempDir,
}

impl Deref for TempDb {
    type Target = RocksDBStorage;
    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

pub fn open(path: &Path) -> RocksDBStorage {
    RocksDBStorage::open(path, &RocksDBConfig::default()).unwrap()
}

pub fn temp_db() -> TempDb {
    let dir = TempDir::new().unwrap();
    TempDb { db: open(dir.path()), _dir: dir }
}

pub fn dump(db: &RocksDBStorage) -> Vec<(Vec<u8>, Vec<u8>)> {
    view(db, |txn| scan_prefix(txn, &[])).unwrap()
}

pub const CONTRACTS: [[u8; 32]; 2] = [[0x11; 32], [0x22; 32]];

fn legacy_nodes(seed: u64) -> Vec<(TriePath, Node)> {
    (0..6u64)
        .map(|i| {
            let path: TriePath = (0..=i).map(|bit| ((seed + i) >> bit) & 1 == 1).collect();
            let left: TriePath = [true, false].into_iter().collect();
            let right: TriePath = [false; 4].into_iter().collect();
            let node = if i % 3 == 0 {
                Node::binary(Felt::from(seed * 10 + i), left, right)
            } else {
                Node::leaf(Felt::from(seed * 10 + i))
            };
            (path, node)
        })
        .collect()
}

pub fn chain(len: u64, network: &Network) -> Vec<Block> {
    let mut parent_hash = Felt::ZERO;
    (0..len)
        .map(|n| {
            let transactions: Vec<_> = (0..n % 4)
                .map(|i| TransactionRecord { hash: Felt::from(1000 * n + i), calldata: vec![Felt::from(i)] })
                .collect();
            let receipts = transactions
                .iter()
                .map(|tx| Receipt {
                    transaction_hash: tx.hash,
                    events: vec![Event { from_address: Felt::from(0xabcu64), keys: vec![tx.hash], data: vec![] }],
                })
                .collect();
            let header = Header { number: n, parent_hash, timestamp: 1_000 + n, ..Default::default() };
            let block = Block { header, transactions, receipts }.seal(network);
            parent_hash = block.header.hash;
            block
        })
        .collect()
}

/// A database at schema version 1 in the old layout: contract storage roots in the `Unused` bucket, trie nodes in
/// the legacy encoding, stale event blooms and no block commitments.
pub fn seed_legacy_db(db: &RocksDBStorage, network: &Network) {
    update(db, |txn| {
        txn.set(&Bucket::SchemaVersion.prefix(), &1u64.to_be_bytes())?;

        let mut tries = vec![(Bucket::ClassesTrie.prefix(), 1), (Bucket::StateTrie.prefix(), 2)];
        for (i, address) in CONTRACTS.iter().enumerate() {
            txn.set(&Bucket::Unused.key(&[address]), &[6, 0b1010_1000])?;
            tries.push((Bucket::ContractStorage.key(&[address]), 3 + i as u64));
        }
        txn.set(&Bucket::ClassesTrie.prefix(), &[1, 0x80])?;
        txn.set(&Bucket::StateTrie.prefix(), &[3, 0x20])?;

        for (prefix, seed) in tries {
            for (path, node) in legacy_nodes(seed) {
                let mut key = prefix.to_vec();
                write_path(&path, &mut key)?;
                txn.set(&key, &encode_legacy(&node)?)?;
            }
        }

        for mut block in chain(9, network) {
            block.header.events_bloom = Default::default();
            store_block(txn, &block)?;
        }
        Ok::<_, MigrationError>(())
    })
    .unwrap();
}
