// Dashboard view model - visible-sensor state, role gating, frame composition
use crate::application::acquisition_service::{AcquisitionService, HistoryPhase};
use crate::domain::alert::Alert;
use crate::domain::sensor::SensorRegistry;
use crate::domain::session::{Identity, Role};
use crate::domain::telemetry::{TelemetrySeries, TimeRange};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const JUDGE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq)]
pub enum ControlError {
    /// The current role is the restricted read-only tier.
    #[error("not available for the current role")]
    RestrictedRole,
}

/// Ordered set of sensor ids chosen for display. Starts as the
/// `powertrain` preset; toggles flip a single id, presets replace the set
/// wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSensors {
    ids: Vec<String>,
}

impl VisibleSensors {
    pub fn new(registry: &SensorRegistry) -> Self {
        let ids = registry
            .preset("powertrain")
            .map(|ids| ids.to_vec())
            .unwrap_or_default();
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Remove the id if present, otherwise append it; other ids keep their
    /// relative order.
    pub fn toggle(&mut self, sensor_id: &str) {
        if let Some(pos) = self.ids.iter().position(|id| id == sensor_id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(sensor_id.to_string());
        }
    }

    /// Replace the whole set with a preset's id list, discarding prior
    /// manual toggles. An unknown preset name is a no-op; returns whether
    /// anything was applied.
    pub fn apply_preset(&mut self, registry: &SensorRegistry, name: &str) -> bool {
        match registry.preset(name) {
            Some(ids) => {
                self.ids = ids.to_vec();
                true
            }
            None => false,
        }
    }
}

/// One gauge on the dashboard: the latest reading for a visible sensor.
#[derive(Debug, Clone)]
pub struct GaugeReading {
    pub id: String,
    pub label: String,
    pub unit: String,
    pub max_value: f64,
    /// Absent when the snapshot did not report this channel.
    pub value: Option<f64>,
}

/// Per-sensor summary of the historical series, the console stand-in for a
/// rendered chart.
#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub id: String,
    pub label: String,
    pub unit: String,
    pub samples: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub last: Option<f64>,
}

/// Everything one render pass needs, independent of how it is drawn.
#[derive(Debug, Clone)]
pub struct DashboardFrame {
    pub email: String,
    pub role: Role,
    pub range: TimeRange,
    pub snapshot_time: Option<DateTime<Utc>>,
    pub alerts: Vec<Alert>,
    pub gauges: Vec<GaugeReading>,
    pub history_phase: HistoryPhase,
    pub summaries: Vec<SeriesSummary>,
}

/// Composes session, acquisition, alerts, registry, and view state into
/// renderable frames, and gates control actions by role. One view model
/// serves both console layouts.
pub struct DashboardPage {
    registry: SensorRegistry,
    acquisition: AcquisitionService,
    identity: Identity,
    visible: VisibleSensors,
    range: TimeRange,
}

impl DashboardPage {
    pub fn new(
        registry: SensorRegistry,
        acquisition: AcquisitionService,
        identity: Identity,
        now: DateTime<Utc>,
    ) -> Self {
        // Crew opens on the trailing hour; a judge is pinned to 7 days.
        let range = match identity.role {
            Role::Crew => TimeRange::last_hours(now, 1),
            Role::Judge => TimeRange::last_days(now, JUDGE_WINDOW_DAYS),
        };
        let visible = VisibleSensors::new(&registry);
        Self {
            registry,
            acquisition,
            identity,
            visible,
            range,
        }
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn visible(&self) -> &VisibleSensors {
        &self.visible
    }

    fn require_control(&self) -> Result<(), ControlError> {
        if self.identity.role.can_control() {
            Ok(())
        } else {
            Err(ControlError::RestrictedRole)
        }
    }

    pub fn set_range(&mut self, range: TimeRange) -> Result<(), ControlError> {
        self.require_control()?;
        self.range = range;
        Ok(())
    }

    /// The "last 10 minutes" quick range.
    pub fn quick_recent_range(&mut self, now: DateTime<Utc>) -> Result<(), ControlError> {
        self.set_range(TimeRange::last_minutes(now, 10))
    }

    pub fn toggle_sensor(&mut self, sensor_id: &str) -> Result<(), ControlError> {
        self.require_control()?;
        self.visible.toggle(sensor_id);
        Ok(())
    }

    pub fn apply_preset(&mut self, name: &str) -> Result<bool, ControlError> {
        self.require_control()?;
        Ok(self.visible.apply_preset(&self.registry, name))
    }

    /// Refresh the historical series for the effective range.
    pub async fn refresh_history(&self) {
        self.acquisition.fetch_history(self.range).await;
    }

    pub fn frame(&self, now: DateTime<Utc>) -> DashboardFrame {
        let snapshot = self.acquisition.latest();
        let history = self.acquisition.history();

        let gauges = self
            .visible
            .ids()
            .iter()
            .filter_map(|id| self.registry.resolve(id))
            .map(|sensor| GaugeReading {
                id: sensor.id.clone(),
                label: sensor.label.clone(),
                unit: sensor.unit.clone(),
                max_value: sensor.max_value,
                value: snapshot.as_ref().and_then(|s| s.reading(&sensor.id)),
            })
            .collect();

        let summaries = self
            .visible
            .ids()
            .iter()
            .filter_map(|id| self.registry.resolve(id))
            .map(|sensor| summarize(&sensor.id, &sensor.label, &sensor.unit, &history.series))
            .collect();

        DashboardFrame {
            email: self.identity.email.clone(),
            role: self.identity.role,
            range: self.range,
            snapshot_time: snapshot.map(|s| s.time),
            alerts: self.acquisition.alerts().active(now),
            gauges,
            history_phase: history.phase,
            summaries,
        }
    }
}

fn summarize(id: &str, label: &str, unit: &str, series: &TelemetrySeries) -> SeriesSummary {
    let mut samples = 0;
    let mut min = None::<f64>;
    let mut max = None::<f64>;
    let mut last = None;

    for snapshot in series {
        if let Some(value) = snapshot.reading(id) {
            samples += 1;
            min = Some(min.map_or(value, |m: f64| m.min(value)));
            max = Some(max.map_or(value, |m: f64| m.max(value)));
            last = Some(value);
        }
    }

    SeriesSummary {
        id: id.to_string(),
        label: label.to_string(),
        unit: unit.to_string(),
        samples,
        min,
        max,
        last,
    }
}
