//! Normalization of inconsistent upstream encodings.
//!
//! The upstream API is not consistent about fee units or about which
//! segwit-era fields are populated, so every decoded record goes through
//! these rules before it reaches a caller.

use serde::{Deserialize, Serialize};

pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Upper bound (exclusive) of the low fee band, sat/vB.
pub const LOW_FEE_BAND_MAX: f64 = 3.0;
/// Upper bound (exclusive) of the medium fee band, sat/vB.
pub const MEDIUM_FEE_BAND_MAX: f64 = 8.0;

/// Fee expressed in BTC.
///
/// Values above 1.0 are taken to be satoshis already. This misreads a fee of
/// exactly one satoshi and any BTC fee above 1.0, which upstream never
/// documents either way.
pub fn fee_btc(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }
    if raw > 1.0 {
        raw / SATS_PER_BTC
    } else {
        raw
    }
}

/// Fee in satoshis, the canonical unit of every decoded record.
pub fn normalize_fee_sats(raw: f64) -> u64 {
    (fee_btc(raw) * SATS_PER_BTC).round() as u64
}

/// `size * 4` stands in for a missing or zero weight (pre-segwit accounting).
pub fn effective_weight(weight: Option<u64>, size: u64) -> u64 {
    match weight {
        Some(w) if w > 0 => w,
        _ => size.saturating_mul(4),
    }
}

pub fn effective_vsize(vsize: Option<u64>, size: u64) -> u64 {
    match vsize {
        Some(v) if v > 0 => v,
        _ => size,
    }
}

/// Fee rate in sat/vB; zero for an empty vsize or a non-finite quotient.
pub fn fee_rate(fee_sats: u64, vsize: u64) -> f64 {
    if vsize == 0 {
        return 0.0;
    }
    let rate = fee_sats as f64 / vsize as f64;
    if rate.is_finite() {
        rate
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeBand {
    Low,
    Medium,
    High,
}

impl FeeBand {
    pub const ALL: [FeeBand; 3] = [FeeBand::Low, FeeBand::Medium, FeeBand::High];

    pub fn classify(rate: f64) -> Self {
        if rate.is_nan() || rate < LOW_FEE_BAND_MAX {
            FeeBand::Low
        } else if rate < MEDIUM_FEE_BAND_MAX {
            FeeBand::Medium
        } else {
            FeeBand::High
        }
    }

    /// Half-open sat/vB range a synthesized item of this band is drawn from.
    pub fn sample_range(self) -> (f64, f64) {
        match self {
            FeeBand::Low => (1.0, LOW_FEE_BAND_MAX),
            FeeBand::Medium => (LOW_FEE_BAND_MAX, MEDIUM_FEE_BAND_MAX),
            FeeBand::High => (MEDIUM_FEE_BAND_MAX, 50.0),
        }
    }
}

impl std::fmt::Display for FeeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeBand::Low => write!(f, "low"),
            FeeBand::Medium => write!(f, "medium"),
            FeeBand::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_btc_fee_converted_to_sats() {
        assert_eq!(normalize_fee_sats(0.001), 100_000);
        assert_eq!(normalize_fee_sats(0.5), 50_000_000);
        assert_eq!(normalize_fee_sats(1.0), 100_000_000);
    }

    #[test]
    fn test_sats_fee_kept() {
        assert_eq!(normalize_fee_sats(29_204_625.0), 29_204_625);
        assert_eq!(normalize_fee_sats(2.0), 2);
        assert_eq!(normalize_fee_sats(141.0), 141);
    }

    #[test]
    fn test_normalize_fee_idempotent_on_canonical_values() {
        for raw in [0.0, 0.001, 0.000_004_2, 0.25, 2.0, 12_345.0, 29_204_625.0] {
            let once = normalize_fee_sats(raw);
            assert_eq!(normalize_fee_sats(once as f64), once, "raw fee {raw}");
        }
    }

    #[test]
    fn test_single_satoshi_is_read_as_btc() {
        // The heuristic cannot tell 1 sat from 1 BTC.
        assert_eq!(normalize_fee_sats(1.0), 100_000_000);
        assert_eq!(fee_btc(1.0), 1.0);
    }

    #[test]
    fn test_invalid_fees_are_zero() {
        assert_eq!(normalize_fee_sats(-3.0), 0);
        assert_eq!(normalize_fee_sats(f64::NAN), 0);
        assert_eq!(normalize_fee_sats(f64::INFINITY), 0);
    }

    #[test]
    fn test_fee_rate_guards() {
        assert_eq!(fee_rate(1_000, 0), 0.0);
        assert_eq!(fee_rate(0, 0), 0.0);
        assert_eq!(fee_rate(2_250, 150), 15.0);
        for (fee, vsize) in [(u64::MAX, 1), (1, u64::MAX), (0, 7)] {
            let rate = fee_rate(fee, vsize);
            assert!(rate.is_finite() && rate >= 0.0);
        }
    }

    #[test]
    fn test_weight_and_vsize_fallbacks() {
        assert_eq!(effective_weight(None, 250), 1_000);
        assert_eq!(effective_weight(Some(0), 250), 1_000);
        assert_eq!(effective_weight(Some(561), 250), 561);
        assert_eq!(effective_vsize(None, 250), 250);
        assert_eq!(effective_vsize(Some(0), 250), 250);
        assert_eq!(effective_vsize(Some(141), 250), 141);
    }

    #[test]
    fn test_fee_band_boundaries() {
        assert_eq!(FeeBand::classify(0.0), FeeBand::Low);
        assert_eq!(FeeBand::classify(2.99), FeeBand::Low);
        assert_eq!(FeeBand::classify(3.0), FeeBand::Medium);
        assert_eq!(FeeBand::classify(7.99), FeeBand::Medium);
        assert_eq!(FeeBand::classify(8.0), FeeBand::High);
        assert_eq!(FeeBand::classify(f64::NAN), FeeBand::Low);
    }
}
