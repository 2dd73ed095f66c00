use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::Result;
use satscope_sdk::preferences::{Network, PreferenceStore, Preferences};
use satscope_sdk::refresh::{RefreshReason, ResourceFamily};
use satscope_sdk::service::DEFAULT_BLOCK_TX_LIMIT;
use satscope_sdk::{AppConfig, AppContext, DashboardSnapshot, Fetched};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct SatscopeArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Network preset: mainnet, testnet or signet
    #[arg(long, env = "SATSCOPE_NETWORK", global = true)]
    pub network: Option<Network>,

    /// Custom API base URL, overrides the network preset
    #[arg(long, env = "SATSCOPE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Directory for cached API responses
    #[arg(long, env = "SATSCOPE_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// How long cached responses stay valid, 0 disables the cache
    #[arg(long, env = "SATSCOPE_CACHE_DURATION_MINUTES", global = true)]
    pub cache_duration_minutes: Option<u64>,

    /// Seconds between refreshes in watch mode
    #[arg(long, env = "SATSCOPE_REFRESH_INTERVAL_SECS", global = true)]
    pub refresh_interval_secs: Option<u64>,

    /// Preferences file, defaults to the platform config dir
    #[arg(long, env = "SATSCOPE_PREFERENCES", global = true)]
    pub preferences: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mempool, fees, recent blocks, price and tip height
    Dashboard,
    /// Mempool size and fee histogram
    Mempool,
    /// Fee-banded sample of mempool transactions
    MempoolTxs,
    /// Most recent blocks
    Blocks,
    /// One block, by hash or height
    Block { id: String },
    /// Transactions of a block
    BlockTxs {
        hash: String,
        #[arg(long, default_value_t = DEFAULT_BLOCK_TX_LIMIT)]
        limit: usize,
    },
    /// One transaction
    Tx { txid: String },
    /// Address balances and counts
    Address { address: String },
    /// Unspent outputs of an address
    Utxos { address: String },
    /// Confirmed transactions of an address
    AddressTxs { address: String },
    /// Look up a txid, block hash, height or address
    Search { query: String },
    /// Recommended fees and projected blocks
    Fees,
    Prices,
    Tip,
    /// Re-run the dashboard on every refresh until interrupted
    Watch,
    /// Delete every cached response
    ClearCache,
    /// Persist the effective flags as the new preferences
    SavePreferences,
}

#[derive(Serialize)]
struct FeeOverview<A, B> {
    recommended: A,
    projected_blocks: B,
}

impl SatscopeArgs {
    pub fn preference_store(&self) -> PreferenceStore {
        PreferenceStore::new(
            self.preferences
                .clone()
                .unwrap_or_else(PreferenceStore::default_path),
        )
    }

    /// Persisted preferences with command line flags applied on top.
    pub fn merge_preferences(&self, mut prefs: Preferences) -> Preferences {
        if let Some(network) = self.network {
            prefs.network = network;
            // an explicit network wins over a stored custom endpoint
            prefs.use_custom_endpoint = false;
        }
        if let Some(base_url) = &self.base_url {
            prefs.use_custom_endpoint = true;
            prefs.custom_endpoint = Some(base_url.clone());
        }
        if let Some(minutes) = self.cache_duration_minutes {
            prefs.cache_duration_minutes = minutes;
        }
        if let Some(secs) = self.refresh_interval_secs {
            prefs.refresh_interval_secs = secs;
        }
        prefs
    }

    pub fn app_config(&self, prefs: &Preferences) -> AppConfig {
        let mut config = AppConfig::from_preferences(prefs);
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        config
    }

    pub async fn run(&self) -> Result<()> {
        let store = self.preference_store();
        let prefs = self.merge_preferences(store.load().await);

        if self.command == Command::SavePreferences {
            store.save(&prefs).await?;
            info!(path = %store.path().display(), "Saved preferences");
            return print_json(&prefs);
        }

        let ctx = AppContext::new(self.app_config(&prefs))?;
        let service = &ctx.service;

        match &self.command {
            Command::Dashboard => print_json(&service.dashboard().await),
            Command::Mempool => print_fetched(&service.mempool_stats().await),
            Command::MempoolTxs => print_fetched(&service.mempool_transactions().await),
            Command::Blocks => print_fetched(&service.recent_blocks().await),
            Command::Block { id } => {
                let block = match id.trim().parse::<u64>() {
                    Ok(height) => service.block_at_height(height).await?,
                    Err(_) => service.block(id).await?,
                };
                print_fetched(&block)
            }
            Command::BlockTxs { hash, limit } => {
                print_fetched(&service.block_transactions(hash, *limit).await?)
            }
            Command::Tx { txid } => print_fetched(&service.transaction(txid).await?),
            Command::Address { address } => print_fetched(&service.address(address).await?),
            Command::Utxos { address } => print_fetched(&service.address_utxos(address).await?),
            Command::AddressTxs { address } => {
                print_fetched(&service.address_transactions(address).await?)
            }
            Command::Search { query } => print_fetched(&service.search(query).await?),
            Command::Fees => {
                let (recommended, projected_blocks) =
                    tokio::join!(service.fee_recommendations(), service.projected_block_fees());
                if recommended.is_synthetic() || projected_blocks.is_synthetic() {
                    warn!("Fee data is synthetic, the API could not be reached");
                }
                print_json(&FeeOverview {
                    recommended,
                    projected_blocks,
                })
            }
            Command::Prices => print_fetched(&service.prices().await),
            Command::Tip => print_fetched(&service.tip_height().await?),
            Command::Watch => watch(&ctx).await,
            Command::ClearCache => {
                let cache = ctx.client.cache();
                let entries = cache.entry_count().await;
                cache.clear().await;
                info!(entries, dir = %cache.dir().display(), "Cleared cache");
                Ok(())
            }
            Command::SavePreferences => Ok(()),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_fetched<T: Serialize>(fetched: &Fetched<T>) -> Result<()> {
    if fetched.is_synthetic() {
        warn!(origin = ?fetched.origin, "Showing placeholder data, the API could not be reached");
    }
    print_json(fetched)
}

fn summarize(snapshot: &DashboardSnapshot) -> String {
    let tip = snapshot
        .tip_height
        .map(|h| h.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "tip {} | mempool {} tx {:.1} MvB | fees {}/{}/{} sat/vB | ${:.0}{}",
        tip,
        snapshot.mempool.data.tx_count,
        snapshot.mempool.data.vsize as f64 / 1_000_000.0,
        snapshot.fees.data.fastest,
        snapshot.fees.data.half_hour,
        snapshot.fees.data.hour,
        snapshot.prices.data.usd,
        if snapshot.is_synthetic() { " (placeholder)" } else { "" },
    )
}

async fn watch(ctx: &AppContext) -> Result<()> {
    ctx.start_refresh();
    let Some(interval) = ctx.refresh.interval() else {
        eyre::bail!("watch needs a refresh interval above zero");
    };
    let mut ticks = ctx.refresh.subscribe(ResourceFamily::All);
    info!(interval = ?interval, "Watching, press Ctrl+C to stop");

    let mut last_tip = None;
    ctx.refresh.trigger_now();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, stopping");
                break;
            }
            tick = ticks.recv() => match tick {
                Ok(tick) => {
                    if tick.reason == RefreshReason::Timer {
                        ctx.service.invalidate_dashboard().await;
                    }
                    let snapshot = ctx.service.dashboard().await;
                    if let (Some(previous), Some(tip)) = (last_tip, snapshot.tip_height) {
                        if tip != previous {
                            info!(from = previous, to = tip, "New block tip");
                        }
                    }
                    last_tip = snapshot.tip_height.or(last_tip);
                    println!("{}", summarize(&snapshot));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Watch loop lagged, skipped {} refreshes", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
    ctx.refresh.stop();
    Ok(())
}
