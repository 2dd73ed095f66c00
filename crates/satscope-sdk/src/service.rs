//! The data pipeline: cache-backed fetch, schema decode, fallback.
//!
//! Aggregate views (mempool, recent blocks, fees, prices, the dashboard)
//! never fail. When the primary endpoint and any documented secondary
//! endpoint both fail they are answered by the [`Synthesizer`], and the
//! returned [`Fetched::origin`] says so. Lookups of one specific entity
//! (a transaction, an address, a block) surface their error instead.

use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use satscope_core::models::{
    AddressInfo, AddressUtxo, Block, FeeRecommendations, MempoolStats, MempoolTransaction, Prices,
    ProjectedBlockFees, Transaction,
};
use satscope_core::{decode, decode_hex_id, decode_text, FromJson};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::endpoints;
use crate::errors::{ApiError, Result};
use crate::search::{validate_address, validate_hex_id, SearchQuery, SearchResult};
use crate::synthesizer::Synthesizer;

/// Size of a fully synthesized mempool sample.
pub const SYNTHETIC_SAMPLE_SIZE: usize = 100;
/// Transactions loaded per block by default.
pub const DEFAULT_BLOCK_TX_LIMIT: usize = 25;

/// Where a result came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Live,
    Cache,
    /// A documented alternative endpoint answered instead of the primary.
    Secondary,
    /// Real data topped up with synthesized items.
    Supplemented,
    Synthetic,
}

impl DataOrigin {
    fn from_body(from_cache: bool) -> Self {
        if from_cache {
            DataOrigin::Cache
        } else {
            DataOrigin::Live
        }
    }
}

/// A pipeline result plus its advisory origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub origin: DataOrigin,
}

impl<T> Fetched<T> {
    pub fn new(data: T, origin: DataOrigin) -> Self {
        Self { data, origin }
    }

    pub fn synthetic(data: T) -> Self {
        Self::new(data, DataOrigin::Synthetic)
    }

    /// True when any part of the data was made up.
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self.origin,
            DataOrigin::Supplemented | DataOrigin::Synthetic
        )
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            origin: self.origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub mempool: Fetched<MempoolStats>,
    pub fees: Fetched<FeeRecommendations>,
    pub blocks: Fetched<Vec<Block>>,
    pub prices: Fetched<Prices>,
    /// Absent when the tip height could not be fetched.
    pub tip_height: Option<u64>,
}

impl DashboardSnapshot {
    pub fn is_synthetic(&self) -> bool {
        self.mempool.is_synthetic()
            || self.fees.is_synthetic()
            || self.blocks.is_synthetic()
            || self.prices.is_synthetic()
    }
}

pub struct DataService {
    client: Arc<ApiClient>,
    synthesizer: Arc<Synthesizer>,
}

impl DataService {
    pub fn new(client: Arc<ApiClient>, synthesizer: Arc<Synthesizer>) -> Self {
        Self {
            client,
            synthesizer,
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    // ---------------------------------------------------------------------
    // Loading primitives
    // ---------------------------------------------------------------------

    async fn load<T: FromJson>(&self, path: &str) -> Result<Fetched<T>> {
        self.load_with(path, |bytes| decode::<T>(bytes)).await
    }

    async fn load_text<T>(&self, path: &str) -> Result<Fetched<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.load_with(path, |bytes| decode_text::<T>(bytes)).await
    }

    /// A body that fails to decode is evicted so the next call refetches it.
    async fn load_with<T>(
        &self,
        path: &str,
        decoder: impl FnOnce(&[u8]) -> satscope_core::error::Result<T>,
    ) -> Result<Fetched<T>> {
        let body = self.client.fetch_with_cache(path).await?;
        match decoder(&body.bytes) {
            Ok(data) => Ok(Fetched::new(data, DataOrigin::from_body(body.from_cache))),
            Err(e) => {
                warn!(path, field = e.field_path(), "Failed to decode response: {}", e.reason());
                self.client.evict(path).await;
                Err(ApiError::decode(path, e))
            }
        }
    }

    // ---------------------------------------------------------------------
    // Aggregate views
    // ---------------------------------------------------------------------

    pub async fn mempool_stats(&self) -> Fetched<MempoolStats> {
        match self.load(endpoints::MEMPOOL).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Mempool stats unavailable, synthesizing: {}", e);
                Fetched::synthetic(self.synthesizer.mempool_stats())
            }
        }
    }

    /// Falls back to a single synthesized block.
    pub async fn recent_blocks(&self) -> Fetched<Vec<Block>> {
        match self.load(endpoints::RECENT_BLOCKS).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Recent blocks unavailable, synthesizing: {}", e);
                Fetched::synthetic(self.synthesizer.blocks(1, None))
            }
        }
    }

    /// Visualization feed. Recent transactions first, the fee histogram
    /// second; whatever real data arrives is topped up so every fee band is
    /// represented.
    pub async fn mempool_transactions(&self) -> Fetched<Vec<MempoolTransaction>> {
        let real = match self.load::<Vec<MempoolTransaction>>(endpoints::MEMPOOL_RECENT).await {
            Ok(recent) => Some(recent),
            Err(e) => {
                warn!("Recent mempool transactions unavailable, trying fee histogram: {}", e);
                self.histogram_sample().await
            }
        };

        let Some(real) = real else {
            warn!("No mempool sample available, synthesizing");
            return Fetched::synthetic(
                self.synthesizer
                    .mempool_transactions(SYNTHETIC_SAMPLE_SIZE),
            );
        };

        let supplemented = self.synthesizer.supplement_fee_bands(real.data);
        if supplemented.generated > 0 {
            debug!(generated = supplemented.generated, "Supplemented fee bands");
            Fetched::new(supplemented.items, DataOrigin::Supplemented)
        } else {
            Fetched::new(supplemented.items, real.origin)
        }
    }

    async fn histogram_sample(&self) -> Option<Fetched<Vec<MempoolTransaction>>> {
        match self.load::<MempoolStats>(endpoints::MEMPOOL).await {
            Ok(stats) => {
                let buckets = stats.data.fee_histogram.unwrap_or_default();
                let items = self.synthesizer.from_histogram(&buckets);
                if items.is_empty() {
                    warn!("Mempool fee histogram is empty");
                    None
                } else {
                    Some(Fetched::new(items, DataOrigin::Secondary))
                }
            }
            Err(e) => {
                warn!("Fee histogram unavailable: {}", e);
                None
            }
        }
    }

    pub async fn fee_recommendations(&self) -> Fetched<FeeRecommendations> {
        match self.load(endpoints::FEES_RECOMMENDED).await {
            Ok(fees) => fees,
            Err(e) => {
                warn!("Fee recommendations unavailable, synthesizing: {}", e);
                Fetched::synthetic(self.synthesizer.fee_recommendations())
            }
        }
    }

    pub async fn projected_block_fees(&self) -> Fetched<Vec<ProjectedBlockFees>> {
        match self
            .load::<Vec<ProjectedBlockFees>>(endpoints::PROJECTED_BLOCK_FEES)
            .await
        {
            Ok(projected) if !projected.data.is_empty() => projected,
            Ok(_) => {
                warn!("No projected blocks returned, synthesizing");
                Fetched::synthetic(self.synthesizer.projected_blocks())
            }
            Err(e) => {
                warn!("Projected block fees unavailable, synthesizing: {}", e);
                Fetched::synthetic(self.synthesizer.projected_blocks())
            }
        }
    }

    pub async fn prices(&self) -> Fetched<Prices> {
        match self.load(endpoints::PRICES).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!("Prices unavailable, synthesizing: {}", e);
                Fetched::synthetic(self.synthesizer.prices())
            }
        }
    }

    pub async fn dashboard(&self) -> DashboardSnapshot {
        let (mempool, fees, blocks, prices, tip) = tokio::join!(
            self.mempool_stats(),
            self.fee_recommendations(),
            self.recent_blocks(),
            self.prices(),
            self.tip_height(),
        );
        let tip_height = match tip {
            Ok(tip) => Some(tip.data),
            Err(e) => {
                warn!("Tip height unavailable: {}", e);
                None
            }
        };
        DashboardSnapshot {
            mempool,
            fees,
            blocks,
            prices,
            tip_height,
        }
    }

    /// Drop the cached bodies behind [`dashboard`](Self::dashboard) so the
    /// next call goes to the network.
    pub async fn invalidate_dashboard(&self) {
        for path in [
            endpoints::MEMPOOL,
            endpoints::FEES_RECOMMENDED,
            endpoints::RECENT_BLOCKS,
            endpoints::PRICES,
            endpoints::TIP_HEIGHT,
        ] {
            self.client.evict(path).await;
        }
    }

    // ---------------------------------------------------------------------
    // Single entities
    // ---------------------------------------------------------------------

    pub async fn tip_height(&self) -> Result<Fetched<u64>> {
        self.load_text(endpoints::TIP_HEIGHT).await
    }

    pub async fn block(&self, hash: &str) -> Result<Fetched<Block>> {
        let hash = validate_hex_id(hash)?;
        self.load(&endpoints::block(&hash)).await
    }

    /// `/block-height/{h}` then `/block/{hash}`; the block list ending at
    /// `height` when that fails.
    pub async fn block_at_height(&self, height: u64) -> Result<Fetched<Block>> {
        let primary = self.block_at_height_primary(height).await;
        let primary_err = match primary {
            Ok(block) => return Ok(block),
            Err(e) => e,
        };
        warn!(height, "Block lookup by height failed, trying block list: {}", primary_err);

        match self
            .load::<Vec<Block>>(&endpoints::blocks_from(height))
            .await
        {
            Ok(blocks) => match blocks.data.into_iter().find(|b| b.height == height) {
                Some(block) => Ok(Fetched::new(block, DataOrigin::Secondary)),
                None => Err(primary_err),
            },
            Err(e) => {
                debug!(height, "Block list fallback failed: {}", e);
                Err(primary_err)
            }
        }
    }

    async fn block_at_height_primary(&self, height: u64) -> Result<Fetched<Block>> {
        let hash = self
            .load_with(&endpoints::block_height(height), decode_hex_id)
            .await?;
        self.block(&hash.data).await
    }

    pub async fn block_txids(&self, hash: &str) -> Result<Fetched<Vec<String>>> {
        let hash = validate_hex_id(hash)?;
        self.load(&endpoints::block_txids(&hash)).await
    }

    /// The first `limit` transactions of a block, fetched concurrently.
    /// Transactions that fail to load are left out.
    pub async fn block_transactions(
        &self,
        hash: &str,
        limit: usize,
    ) -> Result<Fetched<Vec<Transaction>>> {
        let txids = self.block_txids(hash).await?;
        let lookups = txids
            .data
            .iter()
            .take(limit)
            .map(|txid| self.transaction(txid));
        let results = join_all(lookups).await;

        let mut transactions = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(tx) => transactions.push(tx.data),
                Err(e) => warn!("Skipping block transaction: {}", e),
            }
        }
        Ok(Fetched::new(transactions, txids.origin))
    }

    pub async fn transaction(&self, txid: &str) -> Result<Fetched<Transaction>> {
        let txid = validate_hex_id(txid)?;
        self.load(&endpoints::tx(&txid)).await
    }

    pub async fn address(&self, address: &str) -> Result<Fetched<AddressInfo>> {
        let address = address.trim();
        validate_address(address)?;
        self.load(&endpoints::address(address)).await
    }

    pub async fn address_utxos(&self, address: &str) -> Result<Fetched<Vec<AddressUtxo>>> {
        let address = address.trim();
        validate_address(address)?;
        self.load(&endpoints::address_utxo(address)).await
    }

    /// Confirmed history, newest first.
    pub async fn address_transactions(&self, address: &str) -> Result<Fetched<Vec<Transaction>>> {
        let address = address.trim();
        validate_address(address)?;
        self.load(&endpoints::address_chain_txs(address)).await
    }

    /// A 64 hex character query is looked up as a transaction first and as
    /// a block when upstream does not know the transaction.
    pub async fn search(&self, input: &str) -> Result<Fetched<SearchResult>> {
        let query = SearchQuery::parse(input)?;
        debug!(%query, "Searching");
        match query {
            SearchQuery::HexId(id) => match self.transaction(&id).await {
                Ok(tx) => Ok(tx.map(|t| SearchResult::Transaction(Box::new(t)))),
                Err(e) if e.is_not_found() => {
                    debug!(id = %id, "Not a transaction, trying block");
                    let block = self.block(&id).await?;
                    Ok(block.map(|b| SearchResult::Block(Box::new(b))))
                }
                Err(e) => Err(e),
            },
            SearchQuery::Height(height) => {
                let block = self.block_at_height(height).await?;
                Ok(block.map(|b| SearchResult::Block(Box::new(b))))
            }
            SearchQuery::Address(address) => {
                let info = self.address(&address).await?;
                Ok(info.map(|a| SearchResult::Address(Box::new(a))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::client::tests::StubFetcher;
    use crate::synthesizer::MIN_ITEMS_PER_BAND;
    use satscope_core::models::TxState;
    use satscope_core::FeeBand;
    use std::time::Duration;

    const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
    const HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    fn service_with(fetcher: Arc<StubFetcher>, dir: &std::path::Path) -> DataService {
        let cache = Arc::new(CacheStore::new(dir, Duration::from_secs(300)));
        let client = Arc::new(ApiClient::new(fetcher, cache));
        DataService::new(client, Arc::new(Synthesizer::seeded(1)))
    }

    fn block_json(hash: &str, height: u64) -> String {
        format!(
            r#"{{"id":"{hash}","height":{height},"version":1,"timestamp":1231006505,
                "tx_count":1,"size":285,"weight":1140,"merkle_root":"{TXID}",
                "previousblockhash":null,"mediantime":1231006505,"nonce":2083236893,
                "bits":486604799,"difficulty":1}}"#
        )
    }

    fn tx_json(txid: &str) -> String {
        format!(
            r#"{{"txid":"{txid}","size":204,"weight":816,"fee":1500,
                "status":{{"confirmed":true,"block_height":800000,"block_time":1690168629}},
                "vin":[],"vout":[{{"value":5000,"scriptpubkey_address":"bc1qtest"}}]}}"#
        )
    }

    #[tokio::test]
    async fn test_mempool_stats_live_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            StubFetcher::new().ok(endpoints::MEMPOOL, r#"{"count":100,"vsize":50000,"total_fee":0.001}"#),
        );
        let service = service_with(fetcher.clone(), dir.path());

        let stats = service.mempool_stats().await;
        assert_eq!(stats.origin, DataOrigin::Live);
        assert_eq!(stats.data.tx_count, 100);
        assert_eq!(stats.data.total_fee_sats, 100_000);

        let again = service.mempool_stats().await;
        assert_eq!(again.origin, DataOrigin::Cache);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_synthesized_and_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().ok(endpoints::RECENT_BLOCKS, "[{\"id\":"));
        let service = service_with(fetcher.clone(), dir.path());

        let blocks = service.recent_blocks().await;
        assert!(blocks.is_synthetic());
        assert_eq!(blocks.data.len(), 1);
        assert_eq!(service.client().cache().entry_count().await, 0);

        service.recent_blocks().await;
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mempool_sample_supplements_recent() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().ok(
            endpoints::MEMPOOL_RECENT,
            &format!(r#"[{{"txid":"{TXID}","fee":2500,"vsize":100,"value":100000}}]"#),
        ));
        let service = service_with(fetcher, dir.path());

        let sample = service.mempool_transactions().await;
        assert_eq!(sample.origin, DataOrigin::Supplemented);
        assert_eq!(sample.data[0].txid, TXID);
        for band in FeeBand::ALL {
            let n = sample.data.iter().filter(|t| t.band() == band).count();
            assert!(n >= MIN_ITEMS_PER_BAND);
        }
    }

    #[tokio::test]
    async fn test_mempool_sample_uses_histogram_secondary() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().ok(
            endpoints::MEMPOOL,
            r#"{"count":3,"vsize":3000,"total_fee":9000,
                "fee_histogram":[[20.0,1000],[5.0,1000],[1.5,1000]]}"#,
        ));
        let service = service_with(fetcher, dir.path());

        let sample = service.mempool_transactions().await;
        assert_eq!(sample.origin, DataOrigin::Supplemented);
        assert_eq!(sample.data.len(), 30);
        assert_eq!(sample.data[0].fee_sats, 20_000);
    }

    #[tokio::test]
    async fn test_mempool_sample_fully_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(Arc::new(StubFetcher::new()), dir.path());
        let sample = service.mempool_transactions().await;
        assert_eq!(sample.origin, DataOrigin::Synthetic);
        assert_eq!(sample.data.len(), SYNTHETIC_SAMPLE_SIZE);
    }

    #[tokio::test]
    async fn test_transaction_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().timeout(&endpoints::tx(TXID)));
        let service = service_with(fetcher, dir.path());

        let err = service.transaction(TXID).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            service.transaction("nope").await,
            Err(ApiError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_transaction_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().ok(&endpoints::tx(TXID), &tx_json(TXID)));
        let service = service_with(fetcher, dir.path());

        let tx = service.transaction(&TXID.to_uppercase()).await.unwrap().data;
        assert_eq!(tx.txid, TXID);
        assert_eq!(tx.status.state, TxState::Confirmed);
        assert_eq!(tx.inputs.len(), 1);
        assert!(tx.inputs[0].is_placeholder);
        assert_eq!(tx.value_sats, 5000);
    }

    #[tokio::test]
    async fn test_block_at_height_secondary() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            StubFetcher::new()
                .status(&endpoints::block_height(0), 503)
                .ok(&endpoints::blocks_from(0), &format!("[{}]", block_json(HASH, 0))),
        );
        let service = service_with(fetcher, dir.path());

        let block = service.block_at_height(0).await.unwrap();
        assert_eq!(block.origin, DataOrigin::Secondary);
        assert_eq!(block.data.hash, HASH);
        assert!(block.data.is_genesis());
    }

    #[tokio::test]
    async fn test_block_at_height_primary() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            StubFetcher::new()
                .ok(&endpoints::block_height(0), HASH)
                .ok(&endpoints::block(HASH), &block_json(HASH, 0)),
        );
        let service = service_with(fetcher, dir.path());
        let block = service.block_at_height(0).await.unwrap();
        assert_eq!(block.origin, DataOrigin::Live);
    }

    #[tokio::test]
    async fn test_block_at_height_both_fail_returns_primary_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().status(&endpoints::block_height(7), 404));
        let service = service_with(fetcher, dir.path());
        let err = service.block_at_height(7).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_block_transactions_skip_failures() {
        let dir = tempfile::tempdir().unwrap();
        let other = "ff".repeat(32);
        let fetcher = Arc::new(
            StubFetcher::new()
                .ok(
                    &endpoints::block_txids(HASH),
                    &format!(r#"["{TXID}","{other}","{}"]"#, "ee".repeat(32)),
                )
                .ok(&endpoints::tx(TXID), &tx_json(TXID))
                .status(&endpoints::tx(&other), 500),
        );
        let service = service_with(fetcher.clone(), dir.path());

        let txs = service.block_transactions(HASH, 2).await.unwrap();
        assert_eq!(txs.data.len(), 1);
        assert_eq!(txs.data[0].txid, TXID);
        // txids plus two transaction lookups; the third txid is past the limit
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_search_falls_back_to_block_on_404() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            StubFetcher::new()
                .status(&endpoints::tx(HASH), 404)
                .ok(&endpoints::block(HASH), &block_json(HASH, 0)),
        );
        let service = service_with(fetcher, dir.path());

        let result = service.search(HASH).await.unwrap();
        assert!(matches!(result.data, SearchResult::Block(_)));
    }

    #[tokio::test]
    async fn test_search_does_not_mask_other_errors() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().status(&endpoints::tx(TXID), 502));
        let service = service_with(fetcher, dir.path());
        let err = service.search(TXID).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_search_address_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let addr = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";
        let stats = r#"{"funded_txo_count":2,"funded_txo_sum":7000,"spent_txo_count":1,
                        "spent_txo_sum":2000,"tx_count":3}"#;
        let fetcher = Arc::new(StubFetcher::new().ok(
            &endpoints::address(addr),
            &format!(r#"{{"address":"{addr}","chain_stats":{stats},"mempool_stats":{stats}}}"#),
        ));
        let service = service_with(fetcher, dir.path());

        let result = service.search(&format!(" {addr} ")).await.unwrap();
        match result.data {
            SearchResult::Address(info) => assert_eq!(info.address, addr),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            service.search("  ").await,
            Err(ApiError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_degrades_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().ok(endpoints::TIP_HEIGHT, "850123\n"));
        let service = service_with(fetcher, dir.path());

        let snapshot = service.dashboard().await;
        assert!(snapshot.is_synthetic());
        assert_eq!(snapshot.tip_height, Some(850_123));
        assert!(!snapshot.blocks.data.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_without_tip() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(Arc::new(StubFetcher::new()), dir.path());
        let snapshot = service.dashboard().await;
        assert_eq!(snapshot.tip_height, None);
        assert_eq!(snapshot.prices.origin, DataOrigin::Synthetic);
    }

    #[tokio::test]
    async fn test_invalidate_dashboard_forces_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new().ok(endpoints::TIP_HEIGHT, "1"));
        let service = service_with(fetcher.clone(), dir.path());

        service.tip_height().await.unwrap();
        service.tip_height().await.unwrap();
        assert_eq!(fetcher.call_count(), 1);
        service.invalidate_dashboard().await;
        assert_eq!(service.tip_height().await.unwrap().origin, DataOrigin::Live);
        assert_eq!(fetcher.call_count(), 2);
    }
}
