//! Scalar user preferences, persisted as a flat JSON object.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ApiError, Result};

pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Signet,
}

impl Network {
    pub fn base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://mempool.space/api",
            Network::Testnet => "https://mempool.space/testnet/api",
            Network::Signet => "https://mempool.space/signet/api",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
        })
    }
}

impl FromStr for Network {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            other => Err(ApiError::Config(format!("unknown network: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub network: Network,
    pub use_custom_endpoint: bool,
    pub custom_endpoint: Option<String>,
    /// 0 disables periodic refresh.
    pub refresh_interval_secs: u64,
    pub cache_duration_minutes: u64,
    pub notifications_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            use_custom_endpoint: false,
            custom_endpoint: None,
            refresh_interval_secs: 60,
            cache_duration_minutes: 5,
            notifications_enabled: false,
        }
    }
}

impl Preferences {
    /// The custom endpoint when enabled and non-empty, else the network preset.
    pub fn effective_base_url(&self) -> String {
        let custom = self
            .custom_endpoint
            .as_deref()
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty());
        match custom {
            Some(url) if self.use_custom_endpoint => url.to_string(),
            _ => self.network.base_url().to_string(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_minutes.saturating_mul(60))
    }
}

/// File-backed [`Preferences`].
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/satscope/preferences.json`, or the working directory
    /// when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::cache::CACHE_DIR_NAME)
            .join(PREFERENCES_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield the defaults.
    pub async fn load(&self) -> Preferences {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No preferences file, using defaults");
                return Preferences::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read preferences: {}", e);
                return Preferences::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(path = %self.path.display(), "Corrupt preferences file, using defaults: {}", e);
                Preferences::default()
            }
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    pub async fn save(&self, prefs: &Preferences) -> Result<()> {
        let io_err = |e: std::io::Error| {
            ApiError::Config(format!("failed to save {}: {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(prefs)
            .map_err(|e| ApiError::Config(format!("failed to encode preferences: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_round_trips_through_strings() {
        for network in [Network::Mainnet, Network::Testnet, Network::Signet] {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
        assert_eq!(" Signet ".parse::<Network>().unwrap(), Network::Signet);
        assert!(matches!("regtest".parse::<Network>(), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_effective_base_url() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.effective_base_url(), "https://mempool.space/api");

        prefs.network = Network::Testnet;
        prefs.custom_endpoint = Some("http://localhost:8999/api/".to_string());
        assert_eq!(prefs.effective_base_url(), "https://mempool.space/testnet/api");

        prefs.use_custom_endpoint = true;
        assert_eq!(prefs.effective_base_url(), "http://localhost:8999/api");

        prefs.custom_endpoint = Some("  ".to_string());
        assert_eq!(prefs.effective_base_url(), "https://mempool.space/testnet/api");
    }

    #[test]
    fn test_durations() {
        let prefs = Preferences::default();
        assert_eq!(prefs.refresh_interval(), Duration::from_secs(60));
        assert_eq!(prefs.cache_duration(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested").join(PREFERENCES_FILE_NAME));
        let prefs = Preferences {
            network: Network::Signet,
            refresh_interval_secs: 0,
            notifications_enabled: true,
            ..Default::default()
        };
        store.save(&prefs).await.unwrap();
        assert_eq!(store.load().await, prefs);
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join(PREFERENCES_FILE_NAME));
        assert_eq!(store.load().await, Preferences::default());

        std::fs::write(store.path(), b"{not json").unwrap();
        assert_eq!(store.load().await, Preferences::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join(PREFERENCES_FILE_NAME));
        std::fs::write(store.path(), br#"{"network":"testnet"}"#).unwrap();
        let prefs = store.load().await;
        assert_eq!(prefs.network, Network::Testnet);
        assert_eq!(prefs.cache_duration_minutes, 5);
    }
}
