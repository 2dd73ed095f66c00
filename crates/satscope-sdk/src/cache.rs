//! Directory-backed response cache.
//!
//! Each entry is a payload file `<key>.bin` plus a parallel `<key>.ts` record
//! holding the write time in unix milliseconds. Expiry is evaluated at read
//! time against the configured duration; expired entries are deleted on
//! access. Every I/O failure degrades to a miss.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

const PAYLOAD_EXT: &str = "bin";
const TIMESTAMP_EXT: &str = "ts";
pub const CACHE_DIR_NAME: &str = "satscope";

pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(thiserror::Error, Debug)]
enum CacheIoError {
    #[error("cache I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unreadable timestamp record {}", path.display())]
    CorruptTimestamp { path: PathBuf },
}

/// Filesystem-safe cache key for an endpoint path, e.g. `/v1/blocks` becomes
/// `v1_blocks`.
pub fn cache_key(endpoint_path: &str) -> String {
    let key: String = endpoint_path
        .trim_start_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.is_empty() {
        "root".to_string()
    } else {
        key
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Default on-disk location, `<platform cache dir>/satscope`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    duration_ms: AtomicU64,
    clock: Arc<dyn Clock>,
    tmp_counter: AtomicU64,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, duration: Duration) -> Self {
        Self::with_clock(dir, duration, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, duration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            duration_ms: AtomicU64::new(duration_millis(duration)),
            clock,
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms.load(Ordering::Relaxed))
    }

    /// Applies to entries already on disk as well, since expiry is computed on read.
    pub fn set_duration(&self, duration: Duration) {
        self.duration_ms
            .store(duration_millis(duration), Ordering::Relaxed);
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{PAYLOAD_EXT}"))
    }

    fn timestamp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{TIMESTAMP_EXT}"))
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_valid(key).await {
            self.evict(key).await;
            return None;
        }
        let path = self.payload_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(source) => {
                let err = CacheIoError::Io { path, source };
                debug!(key, error = %err, "Cache payload unreadable, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, bytes: &[u8]) {
        if self.duration().is_zero() {
            return;
        }
        if let Err(e) = self.try_put(key, bytes).await {
            warn!(key, error = %e, "Failed to write cache entry");
        }
    }

    async fn try_put(&self, key: &str, bytes: &[u8]) -> Result<(), CacheIoError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheIoError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let written_at = self.clock.now().timestamp_millis().to_string();
        self.write_atomic(&self.payload_path(key), bytes).await?;
        self.write_atomic(&self.timestamp_path(key), written_at.as_bytes())
            .await
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), CacheIoError> {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp{}-{n}", std::process::id()));
        let io = |source| CacheIoError::Io {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::write(&tmp, bytes).await.map_err(io)?;
        if let Err(source) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io(source));
        }
        Ok(())
    }

    async fn written_at(&self, key: &str) -> Result<DateTime<Utc>, CacheIoError> {
        let path = self.timestamp_path(key);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CacheIoError::Io {
                path: path.clone(),
                source,
            })?;
        raw.trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or(CacheIoError::CorruptTimestamp { path })
    }

    /// True while the entry's age is within the configured duration. Ages
    /// are taken in both directions so a clock moved backwards does not pin
    /// an entry.
    pub async fn is_valid(&self, key: &str) -> bool {
        let duration = self.duration();
        if duration.is_zero() {
            return false;
        }
        match self.written_at(key).await {
            Ok(written_at) => {
                let age = self.clock.now().signed_duration_since(written_at).abs();
                age.to_std().is_ok_and(|age| age < duration)
            }
            Err(CacheIoError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                false
            }
            Err(e) => {
                debug!(key, error = %e, "Cache timestamp unreadable, treating as miss");
                false
            }
        }
    }

    /// Delete both files of an entry; missing files are not an error.
    pub async fn evict(&self, key: &str) {
        for path in [self.payload_path(key), self.timestamp_path(key)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(key, path = %path.display(), "Evicted cache file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => debug!(key, error = %e, "Failed to evict cache file"),
            }
        }
    }

    pub async fn clear(&self) {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list cache directory");
                return;
            }
        };
        let mut removed = 0usize;
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
                    if !is_file {
                        continue;
                    }
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove cache file"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Cache directory listing interrupted");
                    break;
                }
            }
        }
        debug!(removed, "Cleared cache");
    }

    /// Number of payload files on disk, expired ones included.
    pub async fn entry_count(&self) -> usize {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.path().extension().and_then(|e| e.to_str()) == Some(PAYLOAD_EXT) {
                count += 1;
            }
        }
        count
    }
}
