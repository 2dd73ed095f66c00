//! Periodic refresh signals, independent of any presentation layer.
//!
//! The coordinator owns at most one timer task. Every firing broadcasts a
//! [`RefreshTick`] on the channel of each [`ResourceFamily`]; consumers
//! subscribe to the family they care about and re-run their fetches.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
    Mempool,
    Blocks,
    Search,
    /// Fires alongside every other family.
    All,
}

impl ResourceFamily {
    pub const EVERY: [ResourceFamily; 4] = [
        ResourceFamily::Mempool,
        ResourceFamily::Blocks,
        ResourceFamily::Search,
        ResourceFamily::All,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefreshReason {
    Timer,
    Manual,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RefreshTick {
    pub at: DateTime<Utc>,
    pub reason: RefreshReason,
}

#[derive(Debug, Clone)]
struct Channels {
    mempool: broadcast::Sender<RefreshTick>,
    blocks: broadcast::Sender<RefreshTick>,
    search: broadcast::Sender<RefreshTick>,
    all: broadcast::Sender<RefreshTick>,
}

impl Channels {
    fn new() -> Self {
        Self {
            mempool: broadcast::channel(CHANNEL_CAPACITY).0,
            blocks: broadcast::channel(CHANNEL_CAPACITY).0,
            search: broadcast::channel(CHANNEL_CAPACITY).0,
            all: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    fn sender(&self, family: ResourceFamily) -> &broadcast::Sender<RefreshTick> {
        match family {
            ResourceFamily::Mempool => &self.mempool,
            ResourceFamily::Blocks => &self.blocks,
            ResourceFamily::Search => &self.search,
            ResourceFamily::All => &self.all,
        }
    }

    fn broadcast(&self, reason: RefreshReason) {
        let tick = RefreshTick {
            at: Utc::now(),
            reason,
        };
        for family in ResourceFamily::EVERY {
            // no subscribers is fine
            let _ = self.sender(family).send(tick);
        }
    }
}

struct Running {
    interval: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Running {
    fn shut_down(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Stopped until [`start`](Self::start) is called with a non-zero interval.
pub struct RefreshCoordinator {
    channels: Channels,
    running: Mutex<Option<Running>>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            channels: Channels::new(),
            running: Mutex::new(None),
        }
    }

    /// Cancel any running timer, then fire every `interval` from now on.
    /// A zero interval leaves the coordinator stopped. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = running.take() {
            debug!(interval = ?previous.interval, "Cancelling previous refresh timer");
            previous.shut_down();
        }
        if interval.is_zero() {
            info!("Refresh timer disabled");
            return;
        }

        let token = CancellationToken::new();
        let channels = self.channels.clone();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!("Refresh timer fired");
                        channels.broadcast(RefreshReason::Timer);
                    }
                }
            }
        });
        info!(interval_secs = interval.as_secs_f64(), "Refresh timer started");
        *running = Some(Running {
            interval,
            token,
            handle,
        });
    }

    pub fn stop(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = running.take() {
            previous.shut_down();
            info!("Refresh timer stopped");
        }
    }

    /// Broadcast a manual tick on every family, running or not.
    pub fn trigger_now(&self) {
        self.channels.broadcast(RefreshReason::Manual);
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Interval of the running timer, `None` when stopped.
    pub fn interval(&self) -> Option<Duration> {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|r| r.interval)
    }

    pub fn subscribe(&self, family: ResourceFamily) -> broadcast::Receiver<RefreshTick> {
        self.channels.sender(family).subscribe()
    }
}

impl Drop for RefreshCoordinator {
    fn drop(&mut self) {
        if let Some(running) = self
            .running
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            running.shut_down();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(rx: &mut broadcast::Receiver<RefreshTick>) -> usize {
        let mut n = 0;
        loop {
            match rx.try_recv() {
                Ok(_) => n += 1,
                Err(TryRecvError::Lagged(skipped)) => n += skipped as usize,
                Err(_) => return n,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_every_family() {
        let coordinator = RefreshCoordinator::new();
        let mut receivers: Vec<_> = ResourceFamily::EVERY
            .iter()
            .map(|f| coordinator.subscribe(*f))
            .collect();

        coordinator.start(Duration::from_secs(10));
        assert!(coordinator.is_running());
        tokio::time::sleep(Duration::from_secs(35)).await;

        for rx in receivers.iter_mut() {
            let tick = rx.try_recv().unwrap();
            assert_eq!(tick.reason, RefreshReason::Timer);
            assert_eq!(1 + drain(rx), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_duplicate_firings() {
        let coordinator = RefreshCoordinator::new();
        let mut rx = coordinator.subscribe(ResourceFamily::All);

        coordinator.start(Duration::from_secs(10));
        coordinator.start(Duration::from_secs(10));
        coordinator.start(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(drain(&mut rx), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_restarts_timer() {
        let coordinator = RefreshCoordinator::new();
        let mut rx = coordinator.subscribe(ResourceFamily::Mempool);

        coordinator.start(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(30)).await;
        coordinator.start(Duration::from_secs(5));
        assert_eq!(coordinator.interval(), Some(Duration::from_secs(5)));
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(drain(&mut rx), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_zero_interval_silence_the_timer() {
        let coordinator = RefreshCoordinator::new();
        let mut rx = coordinator.subscribe(ResourceFamily::Blocks);

        coordinator.start(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(15)).await;
        coordinator.stop();
        assert!(!coordinator.is_running());
        assert_eq!(drain(&mut rx), 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(drain(&mut rx), 0);

        coordinator.start(Duration::ZERO);
        assert!(!coordinator.is_running());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(drain(&mut rx), 0);
    }

    #[tokio::test]
    async fn test_trigger_now_while_stopped() {
        let coordinator = RefreshCoordinator::new();
        let mut search = coordinator.subscribe(ResourceFamily::Search);
        let mut all = coordinator.subscribe(ResourceFamily::All);

        coordinator.trigger_now();
        assert_eq!(search.recv().await.unwrap().reason, RefreshReason::Manual);
        assert_eq!(all.recv().await.unwrap().reason, RefreshReason::Manual);
        assert!(!coordinator.is_running());
    }
}
