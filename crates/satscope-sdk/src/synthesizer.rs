//! Placeholder data for aggregate views whose live sources all failed.
//!
//! Shapes are deterministic, values come from an injectable random source so
//! tests can seed it. Every generated record satisfies the same structural
//! invariants as decoded data (64 hex character ids, consistent fee rates,
//! linked block hashes). The synthesizer never fails.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use satscope_core::models::{
    Block, FeeHistogramBucket, FeeRecommendations, MempoolStats, MempoolTransaction, Prices,
    ProjectedBlockFees,
};
use satscope_core::normalize::{fee_rate, FeeBand};

/// Minimum items per fee band in any synthesized or supplemented fee set.
pub const MIN_ITEMS_PER_BAND: usize = 10;
/// Upper bound on any single visualization-oriented batch.
pub const MAX_SYNTHESIZED_ITEMS: usize = 300;
/// Projected blocks shown by the fee view.
pub const PROJECTED_BLOCK_COUNT: usize = 8;

// Keeps rounded fees from drifting across a band boundary.
const BAND_MARGIN: f64 = 0.05;
const DEFAULT_TIP_HEIGHT: u64 = 850_000;
const TARGET_BLOCK_SPACING_SECS: u64 = 600;
const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

type BoxedRng = Box<dyn RngCore + Send>;

pub struct Synthesizer {
    rng: Mutex<BoxedRng>,
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer").finish_non_exhaustive()
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Real items kept plus what was generated to fill the fee bands.
#[derive(Debug, Clone)]
pub struct Supplemented {
    pub items: Vec<MempoolTransaction>,
    pub generated: usize,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    fn with_rng_mut<T>(&self, f: impl FnOnce(&mut BoxedRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *rng)
    }

    pub fn random_txid(&self) -> String {
        self.with_rng_mut(random_hex_id)
    }

    /// `count` visualization entries (clamped to 1..=300). From 30 items up,
    /// every fee band holds at least [`MIN_ITEMS_PER_BAND`].
    pub fn mempool_transactions(&self, count: usize) -> Vec<MempoolTransaction> {
        let count = count.clamp(1, MAX_SYNTHESIZED_ITEMS);
        let guaranteed = MIN_ITEMS_PER_BAND * FeeBand::ALL.len();
        self.with_rng_mut(|rng| {
            (0..count)
                .map(|i| {
                    let band = if count >= guaranteed && i >= guaranteed {
                        FeeBand::ALL[rng.random_range(0..FeeBand::ALL.len())]
                    } else {
                        FeeBand::ALL[i % FeeBand::ALL.len()]
                    };
                    mempool_transaction_in(rng, band)
                })
                .collect()
        })
    }

    /// Top up `real` until every fee band holds [`MIN_ITEMS_PER_BAND`] items,
    /// keeping the total within [`MAX_SYNTHESIZED_ITEMS`]. Real items come
    /// first and keep their order; when the cap forces a cut, each band keeps
    /// its first real items before anything else.
    pub fn supplement_fee_bands(&self, real: Vec<MempoolTransaction>) -> Supplemented {
        let mut per_band: BTreeMap<FeeBand, usize> = BTreeMap::new();
        for item in &real {
            *per_band.entry(item.band()).or_default() += 1;
        }
        let missing = |band: &FeeBand, have: &BTreeMap<FeeBand, usize>| {
            MIN_ITEMS_PER_BAND.saturating_sub(have.get(band).copied().unwrap_or(0))
        };
        let total_missing: usize = FeeBand::ALL.iter().map(|b| missing(b, &per_band)).sum();
        let budget = MAX_SYNTHESIZED_ITEMS - total_missing;

        let kept = if real.len() <= budget {
            real
        } else {
            select_within_budget(real, budget)
        };

        let mut kept_per_band: BTreeMap<FeeBand, usize> = BTreeMap::new();
        for item in &kept {
            *kept_per_band.entry(item.band()).or_default() += 1;
        }

        let mut items = kept;
        let mut generated = 0;
        self.with_rng_mut(|rng| {
            for band in FeeBand::ALL {
                for _ in 0..missing(&band, &kept_per_band) {
                    items.push(mempool_transaction_in(rng, band));
                    generated += 1;
                }
            }
        });
        Supplemented { items, generated }
    }

    /// One entry per histogram bucket, capped at [`MAX_SYNTHESIZED_ITEMS`].
    pub fn from_histogram(&self, buckets: &[FeeHistogramBucket]) -> Vec<MempoolTransaction> {
        buckets
            .iter()
            .filter(|b| b.vsize > 0 && b.fee_rate.is_finite() && b.fee_rate >= 0.0)
            .take(MAX_SYNTHESIZED_ITEMS)
            .map(|bucket| MempoolTransaction {
                txid: self.random_txid(),
                fee_sats: (bucket.fee_rate * bucket.vsize as f64).round() as u64,
                vsize: bucket.vsize,
                value_sats: 0,
            })
            .collect()
    }

    /// `count` linked blocks (clamped to 1..=300), newest first, ending at
    /// `tip_height` when known.
    pub fn blocks(&self, count: usize, tip_height: Option<u64>) -> Vec<Block> {
        let count = count.clamp(1, MAX_SYNTHESIZED_ITEMS);
        let tip = tip_height.unwrap_or(DEFAULT_TIP_HEIGHT).max(count as u64);
        let now = Utc::now().timestamp().max(0) as u64;
        self.with_rng_mut(|rng| {
            let mut previous_hash = random_hex_id(rng);
            let mut oldest_first = Vec::with_capacity(count);
            for offset in (0..count as u64).rev() {
                let height = tip - offset;
                let hash = random_hex_id(rng);
                let timestamp = now.saturating_sub(offset * TARGET_BLOCK_SPACING_SECS);
                let size = rng.random_range(1_000_000..2_300_000u64);
                oldest_first.push(Block {
                    hash: hash.clone(),
                    height,
                    version: 0x2000_0000,
                    timestamp,
                    tx_count: rng.random_range(1_500..4_500u64),
                    size,
                    weight: rng.random_range(3_900_000..=MAX_BLOCK_WEIGHT),
                    merkle_root: random_hex_id(rng),
                    previous_block_hash: Some(previous_hash),
                    difficulty: 86_388_558_925_171.0,
                    nonce: rng.random(),
                    bits: 0x1703_4219,
                    median_time: timestamp.saturating_sub(TARGET_BLOCK_SPACING_SECS * 5),
                });
                previous_hash = hash;
            }
            oldest_first.reverse();
            oldest_first
        })
    }

    pub fn mempool_stats(&self) -> MempoolStats {
        let histogram: Vec<FeeHistogramBucket> = self.with_rng_mut(|rng| {
            let mut rate = rng.random_range(40.0..80.0);
            let mut buckets = Vec::new();
            while rate > 1.0 {
                buckets.push(FeeHistogramBucket {
                    fee_rate: (rate * 100.0_f64).round() / 100.0,
                    vsize: rng.random_range(50_000..800_000u64),
                });
                rate *= rng.random_range(0.55..0.85);
            }
            buckets
        });
        let vsize: u64 = histogram.iter().map(|b| b.vsize).sum();
        let total_fee_sats = histogram
            .iter()
            .map(|b| (b.fee_rate * b.vsize as f64).round() as u64)
            .sum();
        let tx_count = self.with_rng_mut(|rng| vsize / rng.random_range(180..320u64));
        MempoolStats {
            tx_count,
            vsize,
            total_fee_sats,
            fee_histogram: Some(histogram),
        }
    }

    /// Non-decreasing from minimum to fastest.
    pub fn fee_recommendations(&self) -> FeeRecommendations {
        self.with_rng_mut(|rng| {
            let minimum = 1.0;
            let economy = minimum + rng.random_range(0..3) as f64;
            let hour = economy + rng.random_range(0..5) as f64;
            let half_hour = hour + rng.random_range(0..5) as f64;
            let fastest = half_hour + rng.random_range(0..8) as f64;
            FeeRecommendations {
                fastest,
                half_hour,
                hour,
                economy,
                minimum,
            }
        })
    }

    /// [`PROJECTED_BLOCK_COUNT`] projected blocks with falling median fees.
    pub fn projected_blocks(&self) -> Vec<ProjectedBlockFees> {
        self.with_rng_mut(|rng| {
            let mut median = rng.random_range(12.0..40.0);
            (0..PROJECTED_BLOCK_COUNT)
                .map(|_| {
                    let block_vsize = rng.random_range(900_000..1_000_000u64);
                    let low = (median * 0.8_f64).max(1.0);
                    let high = median * rng.random_range(1.5..4.0);
                    let block = ProjectedBlockFees {
                        block_size: block_vsize * 17 / 10,
                        block_vsize,
                        tx_count: rng.random_range(2_000..4_000u64),
                        total_fees_sats: (median * block_vsize as f64).round() as u64,
                        median_fee: (median * 100.0_f64).round() / 100.0,
                        fee_range: vec![low, median, high],
                    };
                    median = (median * rng.random_range(0.6..0.9)).max(1.0);
                    block
                })
                .collect()
        })
    }

    pub fn prices(&self) -> Prices {
        let usd = self.with_rng_mut(|rng| rng.random_range(55_000.0..75_000.0_f64).round());
        Prices {
            time: Some(Utc::now().timestamp().max(0) as u64),
            usd,
            other: BTreeMap::new(),
        }
    }
}

fn random_hex_id(rng: &mut BoxedRng) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn mempool_transaction_in(rng: &mut BoxedRng, band: FeeBand) -> MempoolTransaction {
    let (lo, hi) = band.sample_range();
    let vsize = rng.random_range(110..1_500u64);
    let rate = rng.random_range(lo + BAND_MARGIN..hi - BAND_MARGIN);
    let fee_sats = (rate * vsize as f64).round() as u64;
    debug_assert_eq!(FeeBand::classify(fee_rate(fee_sats, vsize)), band);
    MempoolTransaction {
        txid: random_hex_id(rng),
        fee_sats,
        vsize,
        value_sats: rng.random_range(5_000..50_000_000u64),
    }
}

/// Keep up to [`MIN_ITEMS_PER_BAND`] per band first, then fill the rest of
/// the budget in original order.
fn select_within_budget(real: Vec<MempoolTransaction>, budget: usize) -> Vec<MempoolTransaction> {
    let mut taken_per_band: BTreeMap<FeeBand, usize> = BTreeMap::new();
    let mut keep = vec![false; real.len()];
    let mut kept = 0;
    for (i, item) in real.iter().enumerate() {
        let taken = taken_per_band.entry(item.band()).or_default();
        if *taken < MIN_ITEMS_PER_BAND && kept < budget {
            *taken += 1;
            keep[i] = true;
            kept += 1;
        }
    }
    for flag in keep.iter_mut() {
        if kept >= budget {
            break;
        }
        if !*flag {
            *flag = true;
            kept += 1;
        }
    }
    real.into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}
