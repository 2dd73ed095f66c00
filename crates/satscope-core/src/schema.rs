//! Upstream JSON schemas of every record the pipeline decodes.

use std::collections::BTreeMap;

use crate::decode::{FromJson, Node};
use crate::error::{OutOfRange, Result};
use crate::models::{
    AddressInfo, AddressStats, AddressUtxo, Block, ConfirmationStatus, FeeHistogramBucket,
    FeeRecommendations, MempoolStats, MempoolTransaction, Prices, ProjectedBlockFees, Transaction,
    TxInput, TxOutput, TxState,
};
use crate::normalize::{effective_vsize, effective_weight, normalize_fee_sats};

impl FromJson for FeeHistogramBucket {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let pair = node.elements()?;
        if pair.len() < 2 {
            return OutOfRange {
                path: node.path().to_string(),
                reason: format!("expected a [fee_rate, vsize] pair, got {} items", pair.len()),
            }
            .fail();
        }
        Ok(Self {
            fee_rate: pair[0].as_f64()?,
            vsize: pair[1].as_u64()?,
        })
    }
}

impl FromJson for MempoolStats {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let fee_histogram = node
            .field("fee_histogram")?
            .map(|n| Vec::<FeeHistogramBucket>::from_json(&n))
            .transpose()?;
        Ok(Self {
            tx_count: node.req_u64("count")?,
            vsize: node.req_u64("vsize")?,
            total_fee_sats: normalize_fee_sats(node.req_f64("total_fee")?),
            fee_histogram,
        })
    }
}

impl FromJson for MempoolTransaction {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        Ok(Self {
            txid: node.req_str("txid")?,
            fee_sats: normalize_fee_sats(node.req_f64("fee")?),
            vsize: node.req_u64("vsize")?,
            value_sats: node.opt_u64("value")?.unwrap_or(0),
        })
    }
}

impl FromJson for Block {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let size = node.req_u64("size")?;
        let timestamp = node.req_u64("timestamp")?;
        Ok(Self {
            hash: node.req_str("id")?,
            height: node.req_u64("height")?,
            version: node.opt_u32("version")?.unwrap_or(0),
            timestamp,
            tx_count: node.req_u64("tx_count")?,
            size,
            weight: effective_weight(node.opt_u64("weight")?, size),
            merkle_root: node.req_str("merkle_root")?,
            previous_block_hash: node.opt_str("previousblockhash")?,
            difficulty: node.opt_f64("difficulty")?.unwrap_or(0.0),
            nonce: node.opt_u32("nonce")?.unwrap_or(0),
            bits: node.opt_u32("bits")?.unwrap_or(0),
            median_time: node.opt_u64("mediantime")?.unwrap_or(timestamp),
        })
    }
}

fn read_status(node: &Node<'_>) -> Result<ConfirmationStatus> {
    let confirmed = node.opt_bool("confirmed")?;
    let block_height = node.opt_u64("block_height")?;
    let state = if block_height.is_some() || confirmed == Some(true) {
        TxState::Confirmed
    } else {
        TxState::Unconfirmed
    };
    Ok(ConfirmationStatus {
        state,
        block_height,
        block_hash: node.opt_str("block_hash")?,
        block_time: node.opt_u64("block_time")?,
    })
}

/// A missing status means unconfirmed; an unreadable one means unknown. Never
/// fails the enclosing record.
pub fn decode_status(node: Option<&Node<'_>>) -> ConfirmationStatus {
    match node {
        None => ConfirmationStatus::unconfirmed(),
        Some(node) => read_status(node).unwrap_or_else(|_| ConfirmationStatus::unknown()),
    }
}

impl FromJson for TxInput {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let prevout = node.field("prevout")?;
        let (address, value_sats) = match prevout {
            Some(prevout) => (
                prevout.opt_str("scriptpubkey_address")?,
                prevout.opt_u64("value")?.unwrap_or(0),
            ),
            None => (None, 0),
        };
        Ok(Self {
            txid: node.opt_str("txid")?,
            vout: node.opt_u32("vout")?,
            address,
            value_sats,
            is_coinbase: node.opt_bool("is_coinbase")?.unwrap_or(false),
            is_placeholder: false,
        })
    }
}

impl FromJson for TxOutput {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        Ok(Self {
            address: node.opt_str("scriptpubkey_address")?,
            script_type: node.opt_str("scriptpubkey_type")?,
            value_sats: node.req_u64("value")?,
            is_placeholder: false,
        })
    }
}

fn list_or_placeholder<T: FromJson>(
    node: &Node<'_>,
    key: &str,
    placeholder: fn() -> T,
) -> Result<Vec<T>> {
    let items = match node.field(key)? {
        Some(list) => Vec::<T>::from_json(&list)?,
        None => Vec::new(),
    };
    if items.is_empty() {
        Ok(vec![placeholder()])
    } else {
        Ok(items)
    }
}

impl FromJson for Transaction {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let size = node.req_u64("size")?;
        let status = decode_status(node.field("status")?.as_ref());
        let timestamp = node.opt_u64("timestamp")?.or(status.block_time);

        let outputs = list_or_placeholder(node, "vout", TxOutput::placeholder)?;
        let value_sats = match node.opt_u64("value")? {
            Some(value) => value,
            None => outputs
                .iter()
                .filter(|o| !o.is_placeholder)
                .map(|o| o.value_sats)
                .sum(),
        };

        Ok(Self {
            txid: node.req_str("txid")?,
            fee_sats: normalize_fee_sats(node.opt_f64("fee")?.unwrap_or(0.0)),
            vsize: effective_vsize(node.opt_u64("vsize")?, size),
            value_sats,
            size,
            weight: effective_weight(node.opt_u64("weight")?, size),
            timestamp,
            status,
            inputs: list_or_placeholder(node, "vin", TxInput::placeholder)?,
            outputs,
        })
    }
}

impl FromJson for AddressStats {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        Ok(Self {
            funded_txo_count: node.req_u64("funded_txo_count")?,
            funded_txo_sum: node.req_u64("funded_txo_sum")?,
            spent_txo_count: node.req_u64("spent_txo_count")?,
            spent_txo_sum: node.req_u64("spent_txo_sum")?,
            tx_count: node.req_u64("tx_count")?,
        })
    }
}

impl FromJson for AddressInfo {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        Ok(Self {
            address: node.req_str("address")?,
            chain_stats: AddressStats::from_json(&node.required("chain_stats")?)?,
            mempool_stats: AddressStats::from_json(&node.required("mempool_stats")?)?,
        })
    }
}

impl FromJson for AddressUtxo {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        Ok(Self {
            txid: node.req_str("txid")?,
            vout: node.required("vout")?.as_u32()?,
            status: decode_status(node.field("status")?.as_ref()),
            value_sats: node.req_u64("value")?,
        })
    }
}

impl FromJson for FeeRecommendations {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let hour = node.req_f64("hourFee")?;
        Ok(Self {
            fastest: node.req_f64("fastestFee")?,
            half_hour: node.req_f64("halfHourFee")?,
            hour,
            economy: node.opt_f64("economyFee")?.unwrap_or(hour),
            minimum: node.opt_f64("minimumFee")?.unwrap_or(1.0),
        })
    }
}

impl FromJson for ProjectedBlockFees {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let fee_range = match node.field("feeRange")? {
            Some(range) => range
                .elements()?
                .iter()
                .map(|n| n.as_f64())
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        // blockVSize is fractional upstream
        let rounded = |key: &str| -> Result<u64> {
            Ok(node.opt_f64(key)?.map(|v| v.max(0.0).round() as u64).unwrap_or(0))
        };
        Ok(Self {
            block_size: rounded("blockSize")?,
            block_vsize: rounded("blockVSize")?,
            tx_count: rounded("nTx")?,
            total_fees_sats: normalize_fee_sats(node.opt_f64("totalFees")?.unwrap_or(0.0)),
            median_fee: node.req_f64("medianFee")?,
            fee_range,
        })
    }
}

impl FromJson for Prices {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        let usd = node.req_f64("USD")?;
        let other: BTreeMap<String, f64> = node
            .object()?
            .iter()
            .filter(|(key, _)| key.as_str() != "USD" && key.as_str() != "time")
            .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
            .collect();
        Ok(Self {
            time: node.opt_u64("time")?,
            usd,
            other,
        })
    }
}
