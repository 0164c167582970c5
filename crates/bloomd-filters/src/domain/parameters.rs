//! Bloom filter sizing
//!
//! Standard formulas:
//! - `m = -n * ln(p) / ln(2)^2` bits
//! - `k = (m / n) * ln(2)` hash functions
//! - observed `p = (1 - e^(-kn/m))^k`

use std::f64::consts::LN_2;

/// Derived bloom filter shape
#[derive(Clone, Debug, PartialEq)]
pub struct BloomParams {
    /// Number of bits in the filter (m)
    pub size_bits: usize,
    /// Number of hash functions (k)
    pub hash_count: usize,
    /// False positive rate expected at full capacity
    pub expected_fpr: f64,
}

/// Compute the optimal filter shape for a capacity and target false
/// positive rate.
pub fn optimal_parameters(capacity: u64, target_fpr: f64) -> BloomParams {
    if capacity == 0 {
        return BloomParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 1.0,
        };
    }

    let n = capacity as f64;
    let m = (-n * target_fpr.ln() / (LN_2 * LN_2)).ceil() as usize;
    let m = m.max(1);

    let k = ((m as f64 / n) * LN_2).round() as usize;
    let k = k.clamp(1, 32);

    BloomParams {
        size_bits: m,
        hash_count: k,
        expected_fpr: observed_fpr(m, capacity, k),
    }
}

/// False positive rate for a filter of `m` bits holding `n` keys with `k`
/// hash functions.
pub fn observed_fpr(m: usize, n: u64, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -((k as f64) * (n as f64)) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_meet_target() {
        let params = optimal_parameters(10_000, 0.001);
        assert!(params.size_bits > 10_000);
        assert!(params.hash_count >= 1);
        assert!(
            params.expected_fpr <= 0.0015,
            "expected_fpr {} too high",
            params.expected_fpr
        );
    }

    #[test]
    fn test_zero_capacity_degenerate() {
        let params = optimal_parameters(0, 0.01);
        assert_eq!(params.size_bits, 1);
        assert_eq!(params.hash_count, 1);
    }

    #[test]
    fn test_empty_filter_has_zero_fpr() {
        assert_eq!(observed_fpr(1024, 0, 4), 0.0);
    }

    #[test]
    fn test_tighter_rate_needs_more_bits() {
        let loose = optimal_parameters(1000, 0.01);
        let tight = optimal_parameters(1000, 0.0001);
        assert!(tight.size_bits > loose.size_bits);
    }
}
