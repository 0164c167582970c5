//! Key hashing for bloom filters
//!
//! MurmurHash3 with double hashing: position i is `h1 + i * h2`, so two
//! hash invocations serve any number of hash functions.

use std::io::Cursor;

/// Hash a key with a seed, taking the low 64 bits of murmur3 x64/128.
fn hash_with_seed(key: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(key);
    murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0) as u64
}

/// Compute the `k` bit positions for a key in a filter of `m` bits.
pub fn bit_positions(key: &[u8], k: usize, m: usize) -> Vec<usize> {
    let h1 = hash_with_seed(key, 0);
    let h2 = hash_with_seed(key, 1);

    (0..k)
        .map(|i| {
            let hash = h1.wrapping_add((i as u64).wrapping_mul(h2));
            (hash % m as u64) as usize
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_deterministic() {
        let a = bit_positions(b"some-key", 5, 4096);
        let b = bit_positions(b"some-key", 5, 4096);
        assert_eq!(a, b);
    }

    #[test]
    fn test_positions_in_range() {
        for pos in bit_positions(b"another-key", 8, 1000) {
            assert!(pos < 1000);
        }
    }

    #[test]
    fn test_different_keys_differ() {
        let a = bit_positions(b"key-a", 5, 1 << 20);
        let b = bit_positions(b"key-b", 5, 1 << 20);
        assert_ne!(a, b);
    }
}
