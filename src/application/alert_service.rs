// Alert log - retained, time-bounded record of raised alerts
use crate::domain::alert::Alert;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub const DEFAULT_RETENTION_MINUTES: i64 = 15;

/// Rolling log of alerts, deduplicated by `(level, message)` while the same
/// condition persists and expired after the retention window.
#[derive(Clone)]
pub struct AlertLog {
    entries: Arc<Mutex<Vec<Alert>>>,
    retention: Duration,
}

impl AlertLog {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            retention,
        }
    }

    /// Append candidates, skipping any whose `(level, message)` already has
    /// a non-expired entry. Once a prior entry ages out the same condition
    /// may be appended again.
    pub fn record(&self, candidates: Vec<Alert>, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        let mut entries = self.entries.lock().expect("alert log poisoned");

        for candidate in candidates {
            let duplicate = entries.iter().any(|e| {
                e.raised_at >= cutoff
                    && e.level == candidate.level
                    && e.message == candidate.message
            });
            if !duplicate {
                entries.push(candidate);
            }
        }
    }

    /// Non-expired entries in insertion order, oldest first. Never returns
    /// an entry older than the retention window, even between sweeps.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let cutoff = now - self.retention;
        self.entries
            .lock()
            .expect("alert log poisoned")
            .iter()
            .filter(|e| e.raised_at >= cutoff)
            .cloned()
            .collect()
    }

    /// Drop expired entries.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        self.entries
            .lock()
            .expect("alert log poisoned")
            .retain(|e| e.raised_at >= cutoff);
    }

    /// Run `sweep` on a fixed period until the returned handle is stopped.
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let log = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => log.sweep(Utc::now()),
                }
            }
            tracing::debug!("alert sweeper stopped");
        });

        SweeperHandle { stop: stop_tx }
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_RETENTION_MINUTES))
    }
}

/// Stop handle for the background sweep task.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
}

impl SweeperHandle {
    pub fn stop(self) {
        let _ = self.stop.send(true);
    }
}
