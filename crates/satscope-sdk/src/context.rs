use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{default_cache_dir, CacheStore};
use crate::client::{ApiClient, FetcherConfig, HttpFetcher, ResourceFetcher};
use crate::errors::Result;
use crate::preferences::{Network, Preferences};
use crate::refresh::RefreshCoordinator;
use crate::service::DataService;
use crate::synthesizer::Synthesizer;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub cache_duration: Duration,
    /// Zero leaves the refresh timer stopped.
    pub refresh_interval: Duration,
    pub fetcher: FetcherConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default())
    }
}

impl AppConfig {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            base_url: prefs.effective_base_url(),
            cache_dir: default_cache_dir(),
            cache_duration: prefs.cache_duration(),
            refresh_interval: prefs.refresh_interval(),
            fetcher: FetcherConfig::default(),
        }
    }
}

/// Owns the long-lived services and hands them to consumers.
pub struct AppContext {
    pub client: Arc<ApiClient>,
    pub service: Arc<DataService>,
    pub refresh: Arc<RefreshCoordinator>,
    refresh_interval: Duration,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.base_url, config.fetcher.clone())?);
        Ok(Self::with_parts(config, fetcher, Synthesizer::new()))
    }

    /// Build around a caller-supplied fetcher and synthesizer.
    pub fn with_parts(
        config: AppConfig,
        fetcher: Arc<dyn ResourceFetcher>,
        synthesizer: Synthesizer,
    ) -> Self {
        let cache = Arc::new(CacheStore::new(config.cache_dir.clone(), config.cache_duration));
        let client = Arc::new(ApiClient::new(fetcher, cache));
        let service = Arc::new(DataService::new(client.clone(), Arc::new(synthesizer)));
        info!(
            base_url = %client.base_url(),
            cache_dir = %config.cache_dir.display(),
            "Initialized data pipeline"
        );
        Self {
            client,
            service,
            refresh: Arc::new(RefreshCoordinator::new()),
            refresh_interval: config.refresh_interval,
        }
    }

    /// Start the refresh timer with the configured interval. Requires a
    /// tokio runtime.
    pub fn start_refresh(&self) {
        self.refresh.start(self.refresh_interval);
    }

    pub async fn set_network(&self, network: Network) -> Result<()> {
        self.client.set_base_url(network.base_url()).await
    }

    pub async fn set_base_url(&self, base_url: &str) -> Result<()> {
        self.client.set_base_url(base_url).await
    }

    pub fn set_cache_duration(&self, duration: Duration) {
        self.client.cache().set_duration(duration);
    }

    /// Apply changed preferences to the running services. A new refresh
    /// interval restarts a running timer, and a non-zero interval replacing
    /// a disabled one starts it.
    pub async fn apply_preferences(&mut self, prefs: &Preferences) -> Result<()> {
        self.set_base_url(&prefs.effective_base_url()).await?;
        self.set_cache_duration(prefs.cache_duration());
        let interval = prefs.refresh_interval();
        if interval != self.refresh_interval {
            let was_disabled = self.refresh_interval.is_zero();
            self.refresh_interval = interval;
            if self.refresh.is_running() || was_disabled {
                self.refresh.start(interval);
            }
        }
        Ok(())
    }
}
