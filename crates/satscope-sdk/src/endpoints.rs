//! Endpoint paths of the mempool REST API, relative to the base URL.
//! Implemented against https://mempool.space/docs/api/rest

pub const MEMPOOL: &str = "/mempool";
pub const MEMPOOL_RECENT: &str = "/mempool/recent";
pub const RECENT_BLOCKS: &str = "/v1/blocks";
pub const TIP_HEIGHT: &str = "/blocks/tip/height";
pub const FEES_RECOMMENDED: &str = "/v1/fees/recommended";
pub const PROJECTED_BLOCK_FEES: &str = "/v1/mining/blocks/fees";
pub const PRICES: &str = "/v1/prices";

/// Up to 15 blocks ending at `height`, newest first.
pub fn blocks_from(height: u64) -> String {
    format!("/v1/blocks/{height}")
}

pub fn block(hash: &str) -> String {
    format!("/block/{hash}")
}

/// Plain-text hash of the block at `height`.
pub fn block_height(height: u64) -> String {
    format!("/block-height/{height}")
}

pub fn block_txids(hash: &str) -> String {
    format!("/block/{hash}/txids")
}

pub fn tx(txid: &str) -> String {
    format!("/tx/{txid}")
}

pub fn address(address: &str) -> String {
    format!("/address/{address}")
}

pub fn address_utxo(address: &str) -> String {
    format!("/address/{address}/utxo")
}

pub fn address_chain_txs(address: &str) -> String {
    format!("/address/{address}/txs/chain")
}
