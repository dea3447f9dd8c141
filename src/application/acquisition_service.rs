// Acquisition service - live polling loop and on-demand historical fetch
use crate::application::alert_service::AlertLog;
use crate::application::session_service::SessionService;
use crate::application::telemetry_client::{ClientError, TelemetryClient};
use crate::domain::alert;
use crate::domain::telemetry::{TelemetrySeries, TelemetrySnapshot, TimeRange};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Lifecycle of the historical series: `Idle` until the first fetch, then
/// `Loading -> Ready | Failed`, re-enterable from either terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryPhase {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct HistoryState {
    pub phase: HistoryPhase,
    pub series: TelemetrySeries,
}

struct AcquisitionState {
    latest: Mutex<Option<TelemetrySnapshot>>,
    history: Mutex<HistoryState>,
    // Issuance counter for historical fetches; a completion only applies
    // while its sequence number is still the most recently issued one.
    history_seq: AtomicU64,
    poll_stop: Mutex<Option<watch::Sender<bool>>>,
}

/// Owns the live poll loop and the caller-triggered historical fetch, and
/// feeds every fresh snapshot through the alert rules.
#[derive(Clone)]
pub struct AcquisitionService {
    client: Arc<dyn TelemetryClient>,
    session: SessionService,
    alerts: AlertLog,
    poll_interval: Duration,
    state: Arc<AcquisitionState>,
}

impl AcquisitionService {
    pub fn new(
        client: Arc<dyn TelemetryClient>,
        session: SessionService,
        alerts: AlertLog,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            session,
            alerts,
            poll_interval,
            state: Arc::new(AcquisitionState {
                latest: Mutex::new(None),
                history: Mutex::new(HistoryState {
                    phase: HistoryPhase::Idle,
                    series: Vec::new(),
                }),
                history_seq: AtomicU64::new(0),
                poll_stop: Mutex::new(None),
            }),
        }
    }

    /// Start the live poll task. Each tick fetches the latest snapshot;
    /// success replaces the current one, failure keeps the previous value
    /// and is only logged. `Unauthorized` destroys the session and stops
    /// the loop. Idempotent: a running loop is left alone.
    pub fn start(&self) {
        let mut slot = self.state.poll_stop.lock().expect("poll handle poisoned");
        if slot.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let service = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.poll_interval);
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if !service.poll_tick().await {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("live poll stopped");
        });

        *slot = Some(stop_tx);
    }

    /// Stop the live poll task. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(stop) = self
            .state
            .poll_stop
            .lock()
            .expect("poll handle poisoned")
            .take()
        {
            let _ = stop.send(true);
        }
    }

    /// One poll tick; returns false when the loop should terminate.
    async fn poll_tick(&self) -> bool {
        match self.client.fetch_latest().await {
            Ok(snapshot) => {
                self.alerts.record(alert::evaluate(&snapshot), snapshot.time);
                *self.state.latest.lock().expect("snapshot lock poisoned") = Some(snapshot);
                true
            }
            Err(ClientError::Unauthorized(message)) => {
                // A stale credential would stay invisible if we kept quietly
                // retrying, so the first rejection ends the session.
                tracing::warn!("live poll rejected, ending session: {message}");
                self.force_logout().await;
                self.state
                    .poll_stop
                    .lock()
                    .expect("poll handle poisoned")
                    .take();
                false
            }
            Err(err) => {
                // Transient; the previous snapshot stays on display.
                tracing::warn!("live poll tick failed: {err}");
                true
            }
        }
    }

    /// Fetch a historical window, replacing the current series wholesale.
    ///
    /// Overlapping calls resolve by issuance order: a response arriving for
    /// anything but the most recently issued request is discarded, so a
    /// slow early fetch can never overwrite a later one.
    pub async fn fetch_history(&self, range: TimeRange) {
        let seq = self.state.history_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut history = self.state.history.lock().expect("history lock poisoned");
            history.phase = HistoryPhase::Loading;
        }

        let result = self.client.fetch_history(range).await;

        if self.state.history_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!("discarding superseded history response (seq {seq})");
            return;
        }

        match result {
            Ok(series) => {
                let mut history = self.state.history.lock().expect("history lock poisoned");
                history.series = series;
                history.phase = HistoryPhase::Ready;
            }
            Err(ClientError::Unauthorized(message)) => {
                tracing::warn!("history fetch rejected, ending session: {message}");
                self.force_logout().await;
                let mut history = self.state.history.lock().expect("history lock poisoned");
                history.phase = HistoryPhase::Failed(format!("session expired: {message}"));
            }
            Err(err) => {
                let mut history = self.state.history.lock().expect("history lock poisoned");
                history.phase = HistoryPhase::Failed(err.to_string());
            }
        }
    }

    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.state
            .latest
            .lock()
            .expect("snapshot lock poisoned")
            .clone()
    }

    pub fn history(&self) -> HistoryState {
        self.state
            .history
            .lock()
            .expect("history lock poisoned")
            .clone()
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    async fn force_logout(&self) {
        if let Err(err) = self.session.logout().await {
            tracing::warn!("forced logout failed to clear storage: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_service::{SessionService, TokenCell};
    use crate::application::telemetry_client::{CommandResponse, ExportFormat, LoginResponse};
    use crate::domain::alert::AlertLevel;
    use crate::domain::session::encode_test_token;
    use crate::infrastructure::token_store::TokenStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    enum Scripted {
        Snapshot(serde_json::Value),
        History { gate: Arc<Notify>, series: Vec<serde_json::Value> },
        Fail(fn() -> ClientError),
    }

    struct ScriptedClient {
        latest: Mutex<VecDeque<Scripted>>,
        history: Mutex<VecDeque<Scripted>>,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                latest: Mutex::new(VecDeque::new()),
                history: Mutex::new(VecDeque::new()),
            }
        }

        fn push_latest(&self, step: Scripted) {
            self.latest.lock().unwrap().push_back(step);
        }

        fn push_history(&self, step: Scripted) {
            self.history.lock().unwrap().push_back(step);
        }
    }

    #[async_trait]
    impl TelemetryClient for ScriptedClient {
        async fn login(&self, _: &str, _: &str) -> Result<LoginResponse, ClientError> {
            unimplemented!("not scripted")
        }

        async fn fetch_latest(&self) -> Result<TelemetrySnapshot, ClientError> {
            let step = self.latest.lock().unwrap().pop_front();
            match step {
                Some(Scripted::Snapshot(value)) => Ok(serde_json::from_value(value).unwrap()),
                Some(Scripted::Fail(make)) => Err(make()),
                _ => Err(ClientError::Unreachable("script exhausted".into())),
            }
        }

        async fn fetch_history(&self, _: TimeRange) -> Result<TelemetrySeries, ClientError> {
            let step = self.history.lock().unwrap().pop_front();
            match step {
                Some(Scripted::History { gate, series }) => {
                    gate.notified().await;
                    Ok(series
                        .into_iter()
                        .map(|v| serde_json::from_value(v).unwrap())
                        .collect())
                }
                Some(Scripted::Fail(make)) => Err(make()),
                _ => Err(ClientError::Unreachable("script exhausted".into())),
            }
        }

        async fn send_command(&self, _: &str) -> Result<CommandResponse, ClientError> {
            unimplemented!("not scripted")
        }

        async fn request_export(
            &self,
            _: TimeRange,
            _: ExportFormat,
        ) -> Result<Bytes, ClientError> {
            unimplemented!("not scripted")
        }

        fn export_download_url(&self, _: TimeRange, _: ExportFormat) -> Result<String, ClientError> {
            unimplemented!("not scripted")
        }
    }

    async fn logged_in_session(
        dir: &tempfile::TempDir,
        client: Arc<dyn TelemetryClient>,
    ) -> SessionService {
        let store = TokenStore::new(dir.path().join("session.token"));
        let session = SessionService::new(TokenCell::default(), store, client);
        let token = encode_test_token(&json!({
            "id": "u-1", "email": "driver@team.example", "role": "integrante"
        }));
        session.install(&token).await.unwrap();
        session
    }

    fn snapshot_value(fields: serde_json::Value) -> serde_json::Value {
        let mut value = json!({ "time": Utc::now().to_rfc3339() });
        value
            .as_object_mut()
            .unwrap()
            .extend(fields.as_object().unwrap().clone());
        value
    }

    fn service(client: Arc<ScriptedClient>, session: SessionService) -> AcquisitionService {
        AcquisitionService::new(
            client,
            session,
            AlertLog::default(),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn failed_tick_retains_previous_snapshot() {
        let client = Arc::new(ScriptedClient::new());
        client.push_latest(Scripted::Snapshot(snapshot_value(
            json!({ "coolant_temperature": 70.0 }),
        )));
        client.push_latest(Scripted::Fail(|| {
            ClientError::Unreachable("network down".into())
        }));

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session);

        assert!(service.poll_tick().await);
        let before = service.latest().unwrap();

        assert!(service.poll_tick().await);
        let after = service.latest().unwrap();
        assert_eq!(after.time, before.time);
        assert_eq!(after.reading("coolant_temperature"), Some(70.0));
    }

    #[tokio::test]
    async fn tick_feeds_snapshot_through_alert_rules() {
        let client = Arc::new(ScriptedClient::new());
        client.push_latest(Scripted::Snapshot(snapshot_value(
            json!({ "coolant_temperature": 95.0, "battery_voltage": 8.5 }),
        )));

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session);

        service.poll_tick().await;
        let active = service.alerts().active(Utc::now());
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].level, AlertLevel::Critical);
    }

    #[tokio::test]
    async fn unauthorized_tick_forces_logout_and_stops_polling() {
        let client = Arc::new(ScriptedClient::new());
        client.push_latest(Scripted::Fail(|| {
            ClientError::Unauthorized("token expired".into())
        }));

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session.clone());

        assert!(!service.poll_tick().await);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn unauthorized_history_fetch_forces_logout() {
        let client = Arc::new(ScriptedClient::new());
        client.push_history(Scripted::Fail(|| {
            ClientError::Unauthorized("token expired".into())
        }));

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session.clone());

        let range = TimeRange::last_hours(Utc::now(), 1);
        service.fetch_history(range).await;

        assert!(!session.is_authenticated());
        assert!(matches!(service.history().phase, HistoryPhase::Failed(_)));
    }

    #[tokio::test]
    async fn failed_history_fetch_reports_reason() {
        let client = Arc::new(ScriptedClient::new());
        client.push_history(Scripted::Fail(|| {
            ClientError::Unreachable("connection refused".into())
        }));

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session);

        service.fetch_history(TimeRange::last_hours(Utc::now(), 1)).await;
        match service.history().phase {
            HistoryPhase::Failed(reason) => assert!(reason.contains("connection refused")),
            phase => panic!("unexpected phase {phase:?}"),
        }
    }

    #[tokio::test]
    async fn later_history_request_wins_regardless_of_completion_order() {
        let client = Arc::new(ScriptedClient::new());
        let gate_a = Arc::new(Notify::new());
        let gate_b = Arc::new(Notify::new());

        client.push_history(Scripted::History {
            gate: gate_a.clone(),
            series: vec![snapshot_value(json!({ "engine_rpm": 1000.0 }))],
        });
        client.push_history(Scripted::History {
            gate: gate_b.clone(),
            series: vec![snapshot_value(json!({ "engine_rpm": 2000.0 }))],
        });

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session);

        let now = Utc::now();
        let fetch_a = {
            let service = service.clone();
            tokio::spawn(async move { service.fetch_history(TimeRange::last_hours(now, 2)).await })
        };
        tokio::task::yield_now().await;
        let fetch_b = {
            let service = service.clone();
            tokio::spawn(async move { service.fetch_history(TimeRange::last_hours(now, 1)).await })
        };
        tokio::task::yield_now().await;

        // B completes first, then the stale A response arrives
        gate_b.notify_one();
        fetch_b.await.unwrap();
        gate_a.notify_one();
        fetch_a.await.unwrap();

        let history = service.history();
        assert_eq!(history.phase, HistoryPhase::Ready);
        assert_eq!(history.series.len(), 1);
        assert_eq!(history.series[0].reading("engine_rpm"), Some(2000.0));
    }

    #[tokio::test]
    async fn start_and_stop_manage_a_single_poll_task() {
        let client = Arc::new(ScriptedClient::new());
        client.push_latest(Scripted::Snapshot(snapshot_value(
            json!({ "engine_rpm": 3000.0 }),
        )));

        let dir = tempfile::tempdir().unwrap();
        let session = logged_in_session(&dir, client.clone()).await;
        let service = service(client, session);

        service.start();
        service.start(); // second start is a no-op
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(service.latest().is_some());

        service.stop();
        service.stop(); // stop when not running is fine
    }
}
