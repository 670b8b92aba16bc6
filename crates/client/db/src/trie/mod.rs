//! Trie nodes as stored in the database.
//!
//! A node is a felt value plus, for binary nodes, the paths to its left and right children. Two layouts exist on
//! disk:
//!
//! - The legacy layout, produced by the generic value codec (bincode). See [`legacy`].
//! - The compact layout written by [`Node::encode`]. It starts with a tag byte `>= 0x80`. A legacy entry starts
//!   with the big-endian felt value, whose first byte never exceeds `0x08`, so the two are told apart by looking at
//!   the first byte alone.
//!
//! Paths are serialized as `len: u8 ‖ bits`, most significant bit first, padded with zeroes to a whole byte. Node
//! keys are `prefix ‖ serialized path`.

use bitvec::{order::Msb0, slice::BitSlice, vec::BitVec};
use starknet_types_core::felt::Felt;

pub mod legacy;
mod transaction_storage;

pub use transaction_storage::{TransactionStorage, TrieError};

pub type TriePath = BitVec<u8, Msb0>;
pub type TriePathSlice = BitSlice<u8, Msb0>;

pub const FELT_BYTES: usize = 32;
/// Paths are at most one felt wide (251 bits); their length is stored on one byte.
pub const MAX_PATH_LEN: usize = u8::MAX as usize;

const COMPACT_TAG: u8 = 0x80;
const COMPACT_HAS_CHILDREN: u8 = 0x01;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NodeCodecError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unknown node tag {0:#04x}")]
    UnknownTag(u8),
    #[error("{0} trailing bytes after node")]
    TrailingBytes(usize),
    #[error("Path of {0} bits is too long")]
    PathTooLong(usize),
    #[error("Binary node is missing its {0} child")]
    MissingChild(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub value: Felt,
    pub left: Option<TriePath>,
    pub right: Option<TriePath>,
}

/// Whether `bytes` is a node in the compact layout.
pub fn is_compact_encoding(bytes: &[u8]) -> bool {
    bytes.first().is_some_and(|tag| tag & COMPACT_TAG != 0)
}

impl Node {
    pub fn leaf(value: Felt) -> Self {
        Self { value, left: None, right: None }
    }

    pub fn binary(value: Felt, left: TriePath, right: TriePath) -> Self {
        Self { value, left: Some(left), right: Some(right) }
    }

    /// Write the compact layout: `tag ‖ value ‖ [left path ‖ right path]`.
    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<(), NodeCodecError> {
        match (&self.left, &self.right) {
            (None, None) => {
                buf.push(COMPACT_TAG);
                buf.extend_from_slice(&self.value.to_bytes_be());
            }
            (Some(left), Some(right)) => {
                buf.push(COMPACT_TAG | COMPACT_HAS_CHILDREN);
                buf.extend_from_slice(&self.value.to_bytes_be());
                write_path(left, buf)?;
                write_path(right, buf)?;
            }
            (None, Some(_)) => return Err(NodeCodecError::MissingChild("left")),
            (Some(_), None) => return Err(NodeCodecError::MissingChild("right")),
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, NodeCodecError> {
        let mut buf = Vec::with_capacity(1 + FELT_BYTES);
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NodeCodecError> {
        let (&tag, rest) = bytes.split_first().ok_or(NodeCodecError::UnexpectedEof)?;
        if tag & !COMPACT_HAS_CHILDREN != COMPACT_TAG {
            return Err(NodeCodecError::UnknownTag(tag));
        }
        let value_bytes: &[u8; FELT_BYTES] =
            rest.get(..FELT_BYTES).and_then(|s| s.try_into().ok()).ok_or(NodeCodecError::UnexpectedEof)?;
        let value = Felt::from_bytes_be(value_bytes);
        let mut rest = &rest[FELT_BYTES..];

        let node = if tag & COMPACT_HAS_CHILDREN != 0 {
            let left = read_path(&mut rest)?;
            let right = read_path(&mut rest)?;
            Self::binary(value, left, right)
        } else {
            Self::leaf(value)
        };

        if !rest.is_empty() {
            return Err(NodeCodecError::TrailingBytes(rest.len()));
        }
        Ok(node)
    }
}

pub fn write_path(path: &TriePathSlice, buf: &mut Vec<u8>) -> Result<(), NodeCodecError> {
    let len = u8::try_from(path.len()).map_err(|_| NodeCodecError::PathTooLong(path.len()))?;
    buf.push(len);
    let start = buf.len();
    buf.resize(start + path.len().div_ceil(8), 0);
    for i in path.iter_ones() {
        buf[start + i / 8] |= 0x80 >> (i % 8);
    }
    Ok(())
}

/// Read a path from the front of `bytes`, advancing it.
pub fn read_path(bytes: &mut &[u8]) -> Result<TriePath, NodeCodecError> {
    let (&len, rest) = bytes.split_first().ok_or(NodeCodecError::UnexpectedEof)?;
    let len = len as usize;
    let packed = rest.get(..len.div_ceil(8)).ok_or(NodeCodecError::UnexpectedEof)?;
    let mut path = TriePath::with_capacity(len);
    for i in 0..len {
        path.push(packed[i / 8] & (0x80 >> (i % 8)) != 0);
    }
    *bytes = &rest[packed.len()..];
    Ok(path)
}
