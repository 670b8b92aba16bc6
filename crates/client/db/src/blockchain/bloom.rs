use super::Receipt;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use starknet_types_core::felt::Felt;
use std::fmt;

const WORDS: usize = 32;
const BITS: u64 = (WORDS * 64) as u64;
const PROBES: u64 = 3;

/// 2048-bit bloom filter over the event emitters and keys of a block.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EventsBloom([u64; WORDS]);

impl Default for EventsBloom {
    fn default() -> Self {
        Self([0; WORDS])
    }
}

#[inline]
const fn bit_position(index: u64) -> (usize, u64) {
    ((index >> 6) as usize, 1 << (index & 63))
}

fn probes(item: &Felt) -> impl Iterator<Item = u64> {
    let bytes = item.to_bytes_be();
    (0..PROBES).map(move |k| SipHasher13::new_with_keys(k, 0).hash(&bytes) % BITS)
}

impl EventsBloom {
    pub fn add(&mut self, item: &Felt) {
        for index in probes(item) {
            let (word, mask) = bit_position(index);
            self.0[word] |= mask;
        }
    }

    /// May return false positives, never false negatives.
    pub fn check(&self, item: &Felt) -> bool {
        probes(item).all(|index| {
            let (word, mask) = bit_position(index);
            self.0[word] & mask != 0
        })
    }

    pub fn from_receipts<'a>(receipts: impl IntoIterator<Item = &'a Receipt>) -> Self {
        let mut bloom = Self::default();
        for event in receipts.into_iter().flat_map(|receipt| &receipt.events) {
            bloom.add(&event.from_address);
            for key in &event.keys {
                bloom.add(key);
            }
        }
        bloom
    }

    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|word| word.count_ones()).sum()
    }
}

impl fmt::Debug for EventsBloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventsBloom({} bits set)", self.count_ones())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Event;

    #[test]
    fn test_no_false_negatives() {
        let mut bloom = EventsBloom::default();
        let items: Vec<Felt> = (0..200u64).map(Felt::from).collect();
        items.iter().for_each(|item| bloom.add(item));
        assert!(items.iter().all(|item| bloom.check(item)));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let bloom = EventsBloom::default();
        assert!(!bloom.check(&Felt::ONE));
        assert_eq!(bloom.count_ones(), 0);
    }

    #[test]
    fn test_from_receipts_covers_emitters_and_keys() {
        let event = Event { from_address: Felt::from(10u64), keys: vec![Felt::from(11u64)], data: vec![Felt::from(12u64)] };
        let receipt = Receipt { transaction_hash: Felt::ONE, events: vec![event] };
        let bloom = EventsBloom::from_receipts([&receipt]);

        assert!(bloom.check(&Felt::from(10u64)));
        assert!(bloom.check(&Felt::from(11u64)));
        assert!(bloom.count_ones() <= 6);
    }
}
