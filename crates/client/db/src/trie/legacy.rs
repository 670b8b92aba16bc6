//! Node layout written by the generic value codec, before the compact layout existed.
//!
//! Paths are stored as a bit count and a list of 64-bit words, bit `i` being bit `i % 64` of word `i / 64`.

use super::{Node, NodeCodecError, TriePath, TriePathSlice, FELT_BYTES, MAX_PATH_LEN};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct LegacyPath {
    length: u64,
    words: Vec<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct LegacyNode {
    value: [u8; FELT_BYTES],
    left: Option<LegacyPath>,
    right: Option<LegacyPath>,
}

impl From<&TriePathSlice> for LegacyPath {
    fn from(path: &TriePathSlice) -> Self {
        let mut words = vec![0u64; path.len().div_ceil(64)];
        for i in path.iter_ones() {
            words[i / 64] |= 1 << (i % 64);
        }
        Self { length: path.len() as u64, words }
    }
}

impl TryFrom<LegacyPath> for TriePath {
    type Error = NodeCodecError;

    fn try_from(path: LegacyPath) -> Result<Self, Self::Error> {
        let len = usize::try_from(path.length).unwrap_or(usize::MAX);
        if len > MAX_PATH_LEN {
            return Err(NodeCodecError::PathTooLong(len));
        }
        if path.words.len() < len.div_ceil(64) {
            return Err(NodeCodecError::UnexpectedEof);
        }
        Ok((0..len).map(|i| path.words[i / 64] & (1 << (i % 64)) != 0).collect())
    }
}

pub fn encode_legacy(node: &Node) -> Result<Vec<u8>, bincode::Error> {
    let legacy = LegacyNode {
        value: node.value.to_bytes_be(),
        left: node.left.as_deref().map(Into::into),
        right: node.right.as_deref().map(Into::into),
    };
    bincode::serialize(&legacy)
}

pub fn decode_legacy(bytes: &[u8]) -> Result<Node, LegacyDecodeError> {
    let legacy: LegacyNode = bincode::deserialize(bytes)?;
    Ok(Node {
        value: Felt::from_bytes_be(&legacy.value),
        left: legacy.left.map(TryInto::try_into).transpose()?,
        right: legacy.right.map(TryInto::try_into).transpose()?,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum LegacyDecodeError {
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error(transparent)]
    Path(#[from] NodeCodecError),
}
