//! Block records read and written by the migrations.
//!
//! Every record is bincode-encoded. Headers are keyed by block number, with a reverse index from block hash.
//! Transactions and receipts are keyed by `block number ‖ index`, both big-endian so that a block's entries
//! are contiguous and ordered.

use crate::{
    bucket::{Bucket, DbKey},
    error::DbError,
    storage::{scan_prefix, Transaction},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use starknet_types_core::felt::Felt;

mod bloom;
mod commitments;

pub use bloom::EventsBloom;
pub use commitments::{event_commitment, transaction_commitment, verify_block_hash, BlockHashMismatch};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    pub number: u64,
    pub hash: Felt,
    pub parent_hash: Felt,
    pub sequencer_address: Felt,
    pub timestamp: u64,
    pub transaction_count: u64,
    pub event_count: u64,
    pub events_bloom: EventsBloom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: Felt,
    pub calldata: Vec<Felt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub from_address: Felt,
    pub keys: Vec<Felt>,
    pub data: Vec<Felt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: Felt,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub header: Header,
    /// Ordered as in the block, the transaction at index `i` produced the receipt at index `i`.
    pub transactions: Vec<TransactionRecord>,
    pub receipts: Vec<Receipt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockCommitments {
    pub transaction_commitment: Felt,
    pub event_commitment: Felt,
}

fn block_key(bucket: Bucket, block_n: u64) -> DbKey {
    bucket.key(&[&block_n.to_be_bytes()])
}

fn indexed_key(bucket: Bucket, block_n: u64, index: u64) -> DbKey {
    bucket.key(&[&block_n.to_be_bytes(), &index.to_be_bytes()])
}

fn get_record<T: DeserializeOwned>(txn: &dyn Transaction, key: &[u8]) -> Result<Option<T>, DbError> {
    let Some(bytes) = txn.get(key)? else { return Ok(None) };
    Ok(Some(bincode::deserialize(&bytes)?))
}

fn set_record<T: Serialize>(txn: &dyn Transaction, key: &[u8], value: &T) -> Result<(), DbError> {
    txn.set(key, &bincode::serialize(value)?)
}

fn get_indexed<T: DeserializeOwned>(txn: &dyn Transaction, bucket: Bucket, block_n: u64) -> Result<Vec<T>, DbError> {
    scan_prefix(txn, &block_key(bucket, block_n))?
        .into_iter()
        .map(|(_, bytes)| Ok(bincode::deserialize(&bytes)?))
        .collect()
}

/// Latest stored block number, `None` on an empty chain.
pub fn chain_height(txn: &dyn Transaction) -> Result<Option<u64>, DbError> {
    let Some(bytes) = txn.get(&Bucket::ChainHeight.prefix())? else { return Ok(None) };
    let bytes: [u8; 8] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| DbError::Format(format!("chain height has {} bytes, expected 8", bytes.len()).into()))?;
    Ok(Some(u64::from_be_bytes(bytes)))
}

pub fn block_header_by_number(txn: &dyn Transaction, block_n: u64) -> Result<Option<Header>, DbError> {
    get_record(txn, &block_key(Bucket::BlockHeadersByNumber, block_n))
}

pub fn block_number_by_hash(txn: &dyn Transaction, hash: &Felt) -> Result<Option<u64>, DbError> {
    get_record(txn, &Bucket::BlockHeaderNumbersByHash.key(&[&hash.to_bytes_be()]))
}

/// Returns `None` past the end of the chain.
pub fn block_by_number(txn: &dyn Transaction, block_n: u64) -> Result<Option<Block>, DbError> {
    let Some(header) = block_header_by_number(txn, block_n)? else { return Ok(None) };
    let transactions = get_indexed(txn, Bucket::TransactionsByBlockNumberAndIndex, block_n)?;
    let receipts = get_indexed(txn, Bucket::ReceiptsByBlockNumberAndIndex, block_n)?;
    Ok(Some(Block { header, transactions, receipts }))
}

/// Overwrites the header of a block, and its hash index entry.
pub fn store_block_header(txn: &dyn Transaction, header: &Header) -> Result<(), DbError> {
    set_record(txn, &block_key(Bucket::BlockHeadersByNumber, header.number), header)?;
    set_record(txn, &Bucket::BlockHeaderNumbersByHash.key(&[&header.hash.to_bytes_be()]), &header.number)
}

pub fn store_block(txn: &dyn Transaction, block: &Block) -> Result<(), DbError> {
    let block_n = block.header.number;
    store_block_header(txn, &block.header)?;
    for (index, tx) in (0u64..).zip(&block.transactions) {
        set_record(txn, &indexed_key(Bucket::TransactionsByBlockNumberAndIndex, block_n, index), tx)?;
        set_record(txn, &Bucket::TransactionBlockNumbersAndIndicesByHash.key(&[&tx.hash.to_bytes_be()]), &(block_n, index))?;
    }
    for (index, receipt) in (0u64..).zip(&block.receipts) {
        set_record(txn, &indexed_key(Bucket::ReceiptsByBlockNumberAndIndex, block_n, index), receipt)?;
    }
    if !matches!(chain_height(txn)?, Some(height) if height >= block_n) {
        txn.set(&Bucket::ChainHeight.prefix(), &block_n.to_be_bytes())?;
    }
    Ok(())
}

pub fn store_block_commitments(txn: &dyn Transaction, block_n: u64, commitments: &BlockCommitments) -> Result<(), DbError> {
    set_record(txn, &block_key(Bucket::BlockCommitments, block_n), commitments)
}

pub fn block_commitments(txn: &dyn Transaction, block_n: u64) -> Result<Option<BlockCommitments>, DbError> {
    get_record(txn, &block_key(Bucket::BlockCommitments, block_n))
}
