//! Domain records produced by the data pipeline.
//!
//! Every record is an immutable value built fresh on each pipeline run. All
//! amounts are satoshis after normalization, fee rates are sat/vB.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::{fee_rate, FeeBand};

/// Address label carried by the stand-in input of a transaction without inputs.
pub const UNKNOWN_INPUT_LABEL: &str = "Unknown Input";
/// Address label carried by the stand-in output of a transaction without outputs.
pub const UNKNOWN_OUTPUT_LABEL: &str = "Unknown Output";
/// Amount carried by stand-in inputs and outputs.
pub const PLACEHOLDER_AMOUNT_SATS: u64 = 1_000;

/* --------------------------------------------------------------------- */
/* ---------------------------  /mempool  ------------------------------ */
/* --------------------------------------------------------------------- */

/// One `[fee_rate, vsize]` pair of the mempool fee histogram.
///
/// Upstream orders buckets by descending rate but nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeHistogramBucket {
    pub fee_rate: f64,
    pub vsize: u64,
}

/// `GET /mempool`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolStats {
    pub tx_count: u64,
    pub vsize: u64,
    pub total_fee_sats: u64,
    pub fee_histogram: Option<Vec<FeeHistogramBucket>>,
}

impl MempoolStats {
    /// Average fee rate over the whole mempool.
    pub fn average_fee_rate(&self) -> f64 {
        fee_rate(self.total_fee_sats, self.vsize)
    }
}

/// Entry of the mempool visualization feed (`GET /mempool/recent`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolTransaction {
    pub txid: String,
    pub fee_sats: u64,
    pub vsize: u64,
    pub value_sats: u64,
}

impl MempoolTransaction {
    pub fn fee_rate(&self) -> f64 {
        fee_rate(self.fee_sats, self.vsize)
    }

    pub fn band(&self) -> FeeBand {
        FeeBand::classify(self.fee_rate())
    }
}

/* --------------------------------------------------------------------- */
/* ---------------------------  /block  -------------------------------- */
/* --------------------------------------------------------------------- */

/// `GET /block/:hash` and the elements of `GET /v1/blocks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub version: u32,
    pub timestamp: u64,
    pub tx_count: u64,
    pub size: u64,
    pub weight: u64,
    pub merkle_root: String,
    /// Absent only for genesis.
    pub previous_block_hash: Option<String>,
    pub difficulty: f64,
    pub nonce: u32,
    pub bits: u32,
    pub median_time: u64,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.previous_block_hash.is_none()
    }
}

/* --------------------------------------------------------------------- */
/* -----------------------------  /tx  --------------------------------- */
/* --------------------------------------------------------------------- */

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Confirmed,
    Unconfirmed,
    /// The status object was present but could not be read.
    Unknown,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxState::Confirmed => write!(f, "Confirmed"),
            TxState::Unconfirmed => write!(f, "Unconfirmed"),
            TxState::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationStatus {
    pub state: TxState,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
    pub block_time: Option<u64>,
}

impl ConfirmationStatus {
    pub fn unconfirmed() -> Self {
        Self {
            state: TxState::Unconfirmed,
            block_height: None,
            block_hash: None,
            block_time: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            state: TxState::Unknown,
            ..Self::unconfirmed()
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TxState::Confirmed
    }

    /// Confirmation count relative to `tip_height`, zero when unconfirmed.
    pub fn confirmations(&self, tip_height: u64) -> u64 {
        match (self.state, self.block_height) {
            (TxState::Confirmed, Some(height)) if tip_height >= height => tip_height - height + 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: Option<String>,
    pub vout: Option<u32>,
    pub address: Option<String>,
    pub value_sats: u64,
    pub is_coinbase: bool,
    pub is_placeholder: bool,
}

impl TxInput {
    pub fn placeholder() -> Self {
        Self {
            txid: None,
            vout: None,
            address: Some(UNKNOWN_INPUT_LABEL.to_string()),
            value_sats: PLACEHOLDER_AMOUNT_SATS,
            is_coinbase: false,
            is_placeholder: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Option<String>,
    pub script_type: Option<String>,
    pub value_sats: u64,
    pub is_placeholder: bool,
}

impl TxOutput {
    pub fn placeholder() -> Self {
        Self {
            address: Some(UNKNOWN_OUTPUT_LABEL.to_string()),
            script_type: None,
            value_sats: PLACEHOLDER_AMOUNT_SATS,
            is_placeholder: true,
        }
    }
}

/// `GET /tx/:txid` and the elements of `GET /address/:addr/txs/chain`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    pub fee_sats: u64,
    pub vsize: u64,
    pub value_sats: u64,
    pub size: u64,
    pub weight: u64,
    /// Explicit timestamp, else the confirming block's time.
    pub timestamp: Option<u64>,
    pub status: ConfirmationStatus,
    /// Never empty; see [`TxInput::placeholder`].
    pub inputs: Vec<TxInput>,
    /// Never empty; see [`TxOutput::placeholder`].
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn fee_rate(&self) -> f64 {
        fee_rate(self.fee_sats, self.vsize)
    }

    pub fn band(&self) -> FeeBand {
        FeeBand::classify(self.fee_rate())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.iter().any(|i| i.is_coinbase)
    }
}

/* --------------------------------------------------------------------- */
/* -------------------------  /address  -------------------------------- */
/* --------------------------------------------------------------------- */

/// Stats object reused for both `chain_stats` and `mempool_stats`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStats {
    pub funded_txo_count: u64,
    pub funded_txo_sum: u64,
    pub spent_txo_count: u64,
    pub spent_txo_sum: u64,
    pub tx_count: u64,
}

impl AddressStats {
    /// Funded minus spent. Mempool stats can go negative.
    pub fn balance(&self) -> i64 {
        self.funded_txo_sum as i64 - self.spent_txo_sum as i64
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BalanceScope {
    Chain,
    Mempool,
    Combined,
}

/// `GET /address/:addr`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub chain_stats: AddressStats,
    pub mempool_stats: AddressStats,
}

impl AddressInfo {
    pub fn balance(&self, scope: BalanceScope) -> i64 {
        match scope {
            BalanceScope::Chain => self.chain_stats.balance(),
            BalanceScope::Mempool => self.mempool_stats.balance(),
            BalanceScope::Combined => self.chain_stats.balance() + self.mempool_stats.balance(),
        }
    }

    pub fn tx_count(&self) -> u64 {
        self.chain_stats.tx_count + self.mempool_stats.tx_count
    }
}

/// `GET /address/:addr/utxo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUtxo {
    pub txid: String,
    pub vout: u32,
    pub status: ConfirmationStatus,
    pub value_sats: u64,
}

/* --------------------------------------------------------------------- */
/* ------------------------  fees & prices  ---------------------------- */
/* --------------------------------------------------------------------- */

/// `GET /v1/fees/recommended`, sat/vB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRecommendations {
    pub fastest: f64,
    pub half_hour: f64,
    pub hour: f64,
    pub economy: f64,
    pub minimum: f64,
}

/// Elements of `GET /v1/mining/blocks/fees`: one projected block of pending
/// transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedBlockFees {
    pub block_size: u64,
    pub block_vsize: u64,
    pub tx_count: u64,
    pub total_fees_sats: u64,
    pub median_fee: f64,
    pub fee_range: Vec<f64>,
}

/// `GET /v1/prices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    pub time: Option<u64>,
    pub usd: f64,
    /// Every other currency quoted alongside USD.
    pub other: BTreeMap<String, f64>,
}

impl Prices {
    pub fn sats_to_usd(&self, sats: u64) -> f64 {
        sats as f64 / crate::normalize::SATS_PER_BTC * self.usd
    }
}
