//! Logical tables of the flat key space.
//!
//! Every key stored in the database starts with the one-byte tag of its bucket. Iterating over a bucket
//! means seeking to its tag and stopping at the first key that no longer carries it; there is no end marker.
//!
//! The numbering is part of the on-disk format: new buckets are appended, existing ones are never
//! reordered or removed (retired buckets are kept as `Unused` placeholders).

use smallvec::SmallVec;
use std::fmt;

/// Database key. Most keys are a tag followed by a felt or a couple of big-endian integers, which fits
/// on the stack.
pub type DbKey = SmallVec<[u8; 64]>;

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Bucket {
    /// Global state trie nodes, root pointer at the bare prefix.
    StateTrie = 0,
    /// Previously held the contract storage root pointers at `1 ‖ address`. See revision 2.
    Unused = 1,
    ContractClassHash = 2,
    /// Contract storage trie nodes at `3 ‖ address ‖ path`, root pointers at `3 ‖ address`.
    ContractStorage = 3,
    Class = 4,
    ContractNonce = 5,
    ChainHeight = 6,
    BlockHeaderNumbersByHash = 7,
    BlockHeadersByNumber = 8,
    TransactionBlockNumbersAndIndicesByHash = 9,
    TransactionsByBlockNumberAndIndex = 10,
    ReceiptsByBlockNumberAndIndex = 11,
    StateUpdatesByBlockNumber = 12,
    /// Class trie nodes, root pointer at the bare prefix.
    ClassesTrie = 13,
    ContractStorageHistory = 14,
    ContractNonceHistory = 15,
    ContractClassHashHistory = 16,
    ContractDeploymentHeight = 17,
    L1Height = 18,
    /// Holds the 8-byte big-endian schema version at the bare prefix.
    SchemaVersion = 19,
    Pending = 20,
    BlockCommitments = 21,
}

impl Bucket {
    pub const ALL: &'static [Self] = {
        use Bucket::*;
        &[
            StateTrie,
            Unused,
            ContractClassHash,
            ContractStorage,
            Class,
            ContractNonce,
            ChainHeight,
            BlockHeaderNumbersByHash,
            BlockHeadersByNumber,
            TransactionBlockNumbersAndIndicesByHash,
            TransactionsByBlockNumberAndIndex,
            ReceiptsByBlockNumberAndIndex,
            StateUpdatesByBlockNumber,
            ClassesTrie,
            ContractStorageHistory,
            ContractNonceHistory,
            ContractClassHashHistory,
            ContractDeploymentHeight,
            L1Height,
            SchemaVersion,
            Pending,
            BlockCommitments,
        ]
    };

    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// The bucket prefix, ie. the key of the bucket itself.
    pub fn prefix(self) -> DbKey {
        self.key(&[])
    }

    /// `tag ‖ parts[0] ‖ parts[1] ‖ ...`
    pub fn key(self, parts: &[&[u8]]) -> DbKey {
        let mut key = DbKey::new();
        key.push(self.tag());
        for part in parts {
            key.extend_from_slice(part);
        }
        key
    }

    pub fn name(&self) -> &'static str {
        match self {
            Bucket::StateTrie => "state_trie",
            Bucket::Unused => "unused",
            Bucket::ContractClassHash => "contract_class_hash",
            Bucket::ContractStorage => "contract_storage",
            Bucket::Class => "class",
            Bucket::ContractNonce => "contract_nonce",
            Bucket::ChainHeight => "chain_height",
            Bucket::BlockHeaderNumbersByHash => "block_header_numbers_by_hash",
            Bucket::BlockHeadersByNumber => "block_headers_by_number",
            Bucket::TransactionBlockNumbersAndIndicesByHash => "transaction_block_numbers_and_indices_by_hash",
            Bucket::TransactionsByBlockNumberAndIndex => "transactions_by_block_number_and_index",
            Bucket::ReceiptsByBlockNumberAndIndex => "receipts_by_block_number_and_index",
            Bucket::StateUpdatesByBlockNumber => "state_updates_by_block_number",
            Bucket::ClassesTrie => "classes_trie",
            Bucket::ContractStorageHistory => "contract_storage_history",
            Bucket::ContractNonceHistory => "contract_nonce_history",
            Bucket::ContractClassHashHistory => "contract_class_hash_history",
            Bucket::ContractDeploymentHeight => "contract_deployment_height",
            Bucket::L1Height => "l1_height",
            Bucket::SchemaVersion => "schema_version",
            Bucket::Pending => "pending",
            Bucket::BlockCommitments => "block_commitments",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
