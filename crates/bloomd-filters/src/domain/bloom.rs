//! Bit-array bloom filter
//!
//! The probabilistic payload behind every filter backend. No false
//! negatives: once `insert` returns, `contains` for that key is true for
//! the lifetime of the filter.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hashing::bit_positions;
use super::parameters::{observed_fpr, optimal_parameters};

/// Space-efficient probabilistic set membership
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    #[serde(with = "bits_serde")]
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions (k)
    hash_count: usize,
    /// Size in bits (m)
    size_bits: usize,
    /// Number of keys inserted (n)
    items: u64,
}

/// Serde support for the bit array, stored as raw bytes plus a bit length.
mod bits_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes: Vec<u8> = bits.as_raw_slice().to_vec();
        (bytes, bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create a filter with an explicit shape
    pub fn new(size_bits: usize, hash_count: usize) -> Self {
        Self {
            bits: bitvec![u8, Lsb0; 0; size_bits],
            hash_count,
            size_bits,
            items: 0,
        }
    }

    /// Create a filter sized for `capacity` keys at the given false
    /// positive rate.
    pub fn with_capacity(capacity: u64, false_positive_rate: f64) -> Self {
        let params = optimal_parameters(capacity, false_positive_rate);
        Self::new(params.size_bits, params.hash_count)
    }

    /// Insert a key.
    ///
    /// Returns `true` if the key was newly added, `false` if every one of
    /// its bits was already set.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let positions = bit_positions(key, self.hash_count, self.size_bits);

        let mut newly_added = false;
        for pos in positions {
            if !self.bits[pos] {
                newly_added = true;
                self.bits.set(pos, true);
            }
        }

        if newly_added {
            self.items += 1;
        }
        newly_added
    }

    /// Test whether a key might be in the filter.
    ///
    /// `false` means definitely absent; `true` may be a false positive.
    pub fn contains(&self, key: &[u8]) -> bool {
        let positions = bit_positions(key, self.hash_count, self.size_bits);
        positions.iter().all(|&pos| self.bits[pos])
    }

    /// Number of keys inserted
    pub fn len(&self) -> u64 {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Size of the bit array
    pub fn size_bits(&self) -> usize {
        self.size_bits
    }

    /// Number of hash functions
    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    /// False positive rate at the current fill level
    pub fn false_positive_rate(&self) -> f64 {
        observed_fpr(self.size_bits, self.items, self.hash_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::with_capacity(1000, 0.01);
        for i in 0..1000u32 {
            let key = format!("key-{}", i);
            filter.insert(key.as_bytes());
        }
        for i in 0..1000u32 {
            let key = format!("key-{}", i);
            assert!(filter.contains(key.as_bytes()), "lost key {}", key);
        }
    }

    #[test]
    fn test_insert_reports_new_vs_existing() {
        let mut filter = BloomFilter::with_capacity(100, 0.001);
        assert!(filter.insert(b"alpha"));
        assert!(!filter.insert(b"alpha"));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_absent_key_mostly_absent() {
        let mut filter = BloomFilter::with_capacity(10_000, 0.001);
        for i in 0..10_000u32 {
            filter.insert(format!("present-{}", i).as_bytes());
        }

        let false_positives = (0..10_000u32)
            .filter(|i| filter.contains(format!("absent-{}", i).as_bytes()))
            .count();

        // 0.1% target over 10k probes; allow generous slack
        assert!(
            false_positives < 100,
            "{} false positives",
            false_positives
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let mut filter = BloomFilter::with_capacity(100, 0.01);
        filter.insert(b"persisted");

        let bytes = bincode::serialize(&filter).expect("serialize");
        let restored: BloomFilter = bincode::deserialize(&bytes).expect("deserialize");

        assert!(restored.contains(b"persisted"));
        assert!(!restored.contains(b"never-inserted"));
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.size_bits(), filter.size_bits());
    }
}
