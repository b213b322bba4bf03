//! Store connection health monitor.
//!
//! A heartbeat checks the store on a fixed interval. After a failed heartbeat
//! the monitor retries on a shorter interval up to a capped number of
//! attempts, then waits for the next heartbeat. Any successful check resets
//! the attempt counter.

use crate::config::HealthConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use trust_store::DocumentStore;

/// State of the store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No check has run yet, or the last heartbeat failed.
    Disconnected,
    /// Reconnect attempts are in progress.
    Reconnecting,
    /// The last check succeeded.
    Connected,
    /// Reconnect attempts are exhausted until the next heartbeat.
    Failed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        })
    }
}

/// Lock-free holder for a [`ConnectionStatus`].
#[derive(Debug)]
struct AtomicStatus(AtomicU32);

impl AtomicStatus {
    const fn new(status: ConnectionStatus) -> Self {
        Self(AtomicU32::new(status as u32))
    }

    fn load(&self) -> ConnectionStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => ConnectionStatus::Disconnected,
            1 => ConnectionStatus::Reconnecting,
            2 => ConnectionStatus::Connected,
            _ => ConnectionStatus::Failed,
        }
    }

    fn store(&self, status: ConnectionStatus) {
        self.0.store(status as u32, Ordering::SeqCst);
    }
}

/// Watches the document store connection.
pub struct HealthMonitor<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for HealthMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    store: Arc<S>,
    config: HealthConfig,
    status: AtomicStatus,
    attempts: AtomicU32,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: DocumentStore> HealthMonitor<S> {
    /// Create a stopped monitor.
    pub fn new(store: Arc<S>, config: HealthConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                status: AtomicStatus::new(ConnectionStatus::Disconnected),
                attempts: AtomicU32::new(0),
                task: Mutex::new(None),
            }),
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.load()
    }

    /// Reconnect attempts since the last successful check.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Whether the heartbeat task is running.
    pub fn is_running(&self) -> bool {
        self.inner.task.lock().is_some()
    }

    /// Start the heartbeat task. Does nothing if it is already running.
    pub fn start(&self) {
        let mut task = self.inner.task.lock();
        if task.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.heartbeat_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                inner.heartbeat().await;
            }
        }));
        info!(
            interval_secs = self.inner.config.heartbeat_interval.as_secs(),
            "health monitor started"
        );
    }

    /// Stop the heartbeat task.
    pub fn stop(&self) {
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
            info!("health monitor stopped");
        }
    }

    /// One heartbeat, followed by reconnect attempts if it fails.
    pub async fn heartbeat(&self) -> ConnectionStatus {
        self.inner.heartbeat().await
    }
}

impl<S: DocumentStore> Inner<S> {
    async fn heartbeat(&self) -> ConnectionStatus {
        if self.check().await {
            return ConnectionStatus::Connected;
        }
        self.status.store(ConnectionStatus::Disconnected);

        let max = self.config.max_reconnect_attempts;
        while self.attempts.load(Ordering::SeqCst) < max {
            self.status.store(ConnectionStatus::Reconnecting);
            tokio::time::sleep(self.config.reconnect_interval).await;
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(attempt, max, "reconnecting to document store");
            if self.check().await {
                info!(attempt, "document store reconnected");
                return ConnectionStatus::Connected;
            }
        }

        warn!(attempts = max, "document store unreachable, waiting for next heartbeat");
        self.status.store(ConnectionStatus::Failed);
        ConnectionStatus::Failed
    }

    async fn check(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => {
                self.status.store(ConnectionStatus::Connected);
                self.attempts.store(0, Ordering::SeqCst);
                true
            }
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trust_store::MemoryStore;

    fn monitor(store: &Arc<MemoryStore>) -> HealthMonitor<MemoryStore> {
        HealthMonitor::new(Arc::clone(store), HealthConfig::default())
    }

    #[test]
    fn test_atomic_status_roundtrip() {
        let status = AtomicStatus::new(ConnectionStatus::Disconnected);
        for s in [
            ConnectionStatus::Reconnecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Failed,
            ConnectionStatus::Disconnected,
        ] {
            status.store(s);
            assert_eq!(status.load(), s);
        }
    }

    #[tokio::test]
    async fn test_healthy_store_connects() {
        let store = Arc::new(MemoryStore::new());
        let monitor = monitor(&store);
        assert_eq!(monitor.status(), ConnectionStatus::Disconnected);

        assert_eq!(monitor.heartbeat().await, ConnectionStatus::Connected);
        assert_eq!(monitor.status(), ConnectionStatus::Connected);
        assert_eq!(monitor.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_capped_until_next_success() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let monitor = monitor(&store);

        let started = tokio::time::Instant::now();
        assert_eq!(monitor.heartbeat().await, ConnectionStatus::Failed);
        assert_eq!(monitor.attempts(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(5));

        // Exhausted: the next failing heartbeat does not retry.
        let started = tokio::time::Instant::now();
        assert_eq!(monitor.heartbeat().await, ConnectionStatus::Failed);
        assert_eq!(monitor.attempts(), 5);
        assert_eq!(started.elapsed(), Duration::ZERO);

        store.set_online(true);
        assert_eq!(monitor.heartbeat().await, ConnectionStatus::Connected);
        assert_eq!(monitor.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_succeeds_midway() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let monitor = monitor(&store);

        let restore = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2_500)).await;
                store.set_online(true);
            })
        };
        assert_eq!(monitor.heartbeat().await, ConnectionStatus::Connected);
        assert_eq!(monitor.attempts(), 0);
        restore.await.expect("join");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop() {
        let store = Arc::new(MemoryStore::new());
        let monitor = monitor(&store);
        monitor.start();
        monitor.start();
        assert!(monitor.is_running());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(monitor.status(), ConnectionStatus::Connected);

        monitor.stop();
        assert!(!monitor.is_running());
    }
}
