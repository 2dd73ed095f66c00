use std::sync::Arc;
use std::time::Duration;

use mockito::{Mock, Server, ServerGuard};
use satscope_sdk::{AppConfig, AppContext, FetcherConfig, HttpFetcher, Synthesizer};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
pub const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
pub const ADDRESS: &str = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";

/// A pipeline wired to a mock upstream over real HTTP.
pub struct MockPipeline {
    pub server: ServerGuard,
    pub ctx: AppContext,
    pub cache_dir: TempDir,
}

impl MockPipeline {
    pub async fn new() -> Self {
        Self::with_cache_duration(Duration::from_secs(300)).await
    }

    pub async fn with_cache_duration(cache_duration: Duration) -> Self {
        let server = Server::new_async().await;
        let cache_dir = tempfile::tempdir().unwrap();
        let ctx = pipeline_for(&api_url(&server), &cache_dir, cache_duration, fast_fetcher());
        Self {
            server,
            ctx,
            cache_dir,
        }
    }

    /// Register `GET /api{path}` answering `status` with `body`.
    pub async fn mock(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("GET", format!("/api{path}").as_str())
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_json(&mut self, path: &str, body: &Value) -> Mock {
        self.mock(path, 200, &body.to_string()).await
    }
}

pub fn api_url(server: &ServerGuard) -> String {
    format!("{}/api", server.url())
}

pub fn fast_fetcher() -> FetcherConfig {
    FetcherConfig {
        request_timeout: Duration::from_millis(300),
        resource_timeout: Duration::from_millis(600),
    }
}

pub fn pipeline_for(
    base_url: &str,
    cache_dir: &TempDir,
    cache_duration: Duration,
    fetcher: FetcherConfig,
) -> AppContext {
    let config = AppConfig {
        base_url: base_url.to_string(),
        cache_dir: cache_dir.path().to_path_buf(),
        cache_duration,
        refresh_interval: Duration::ZERO,
        fetcher: fetcher.clone(),
    };
    let http = Arc::new(HttpFetcher::new(base_url, fetcher).unwrap());
    AppContext::with_parts(config, http, Synthesizer::seeded(21))
}

/// Accepts connections and never answers, so every request times out.
pub async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}/api")
}

pub fn block_json(hash: &str, height: u64) -> Value {
    json!({
        "id": hash,
        "height": height,
        "version": 536870912,
        "timestamp": 1713571767,
        "tx_count": 3050,
        "size": 2325617,
        "weight": 3993281,
        "merkle_root": TXID,
        "previousblockhash": "0000000000000000000172014ba58d66455762add0512355ad651207918494ab",
        "mediantime": 1713568541,
        "nonce": 3932395645u32,
        "bits": 386089497,
        "difficulty": 86388558925171.02
    })
}

pub fn tx_json(txid: &str) -> Value {
    json!({
        "txid": txid,
        "version": 2,
        "size": 222,
        "weight": 561,
        "fee": 2820,
        "vin": [{
            "txid": GENESIS_HASH,
            "vout": 1,
            "is_coinbase": false,
            "prevout": { "scriptpubkey_address": ADDRESS, "value": 100000 }
        }],
        "vout": [
            { "scriptpubkey_address": ADDRESS, "scriptpubkey_type": "v0_p2wpkh", "value": 60000 },
            { "scriptpubkey_type": "op_return", "value": 0 }
        ],
        "status": {
            "confirmed": true,
            "block_height": 840000,
            "block_hash": GENESIS_HASH,
            "block_time": 1713571767
        }
    })
}

pub fn address_stats(funded: u64, spent: u64) -> Value {
    json!({
        "funded_txo_count": 2,
        "funded_txo_sum": funded,
        "spent_txo_count": 1,
        "spent_txo_sum": spent,
        "tx_count": 3
    })
}
