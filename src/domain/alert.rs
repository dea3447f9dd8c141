// Alert domain model - threshold rules evaluated against each snapshot
use crate::domain::telemetry::TelemetrySnapshot;
use chrono::{DateTime, Utc};
use std::fmt;

pub const COOLANT_WARNING_C: f64 = 80.0;
pub const COOLANT_CRITICAL_C: f64 = 90.0;
pub const BATTERY_LOW_V: f64 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "WARNING"),
            AlertLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Evaluate the threshold rules against one snapshot.
///
/// Rules are independent and returned in rule order; a sensor absent from
/// the snapshot triggers nothing. The two coolant bands are mutually
/// exclusive. Timestamps come from the snapshot, not the wall clock.
pub fn evaluate(snapshot: &TelemetrySnapshot) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let raised_at = snapshot.time;

    if let Some(coolant) = snapshot.reading("coolant_temperature") {
        if coolant > COOLANT_CRITICAL_C {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                message: format!("coolant temperature critical: {coolant:.1}"),
                raised_at,
            });
        } else if coolant > COOLANT_WARNING_C {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                message: format!("coolant temperature high: {coolant:.1}"),
                raised_at,
            });
        }
    }

    if let Some(voltage) = snapshot.reading("battery_voltage") {
        if voltage < BATTERY_LOW_V {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                message: format!("battery voltage low: {voltage:.1}"),
                raised_at,
            });
        }
    }

    alerts
}
