// Telemetry data domain models
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One timestamped set of current sensor readings as received from the car.
///
/// Snapshots are partial: the device does not report every channel on every
/// cycle, and ids unknown to the registry are kept but never rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub channels: BTreeMap<String, serde_json::Value>,
}

impl TelemetrySnapshot {
    /// Numeric reading for a sensor id, `None` when the channel is absent
    /// from this snapshot or not numeric.
    pub fn reading(&self, id: &str) -> Option<f64> {
        self.channels.get(id).and_then(|v| v.as_f64())
    }
}

/// Chronological run of snapshots over a historical interval. Replaced
/// wholesale on every historical fetch, never merged incrementally.
pub type TelemetrySeries = Vec<TelemetrySnapshot>;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid time range: start {start} is after end {end}")]
pub struct InvalidRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Half-open interval `[start, end)` over which history is fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn last_minutes(now: DateTime<Utc>, minutes: i64) -> Self {
        Self {
            start: now - Duration::minutes(minutes),
            end: now,
        }
    }

    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Self {
        Self {
            start: now - Duration::hours(hours),
            end: now,
        }
    }

    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}
