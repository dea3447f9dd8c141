// Client port for the team's telemetry backend
use crate::domain::telemetry::{InvalidRange, TelemetrySeries, TelemetrySnapshot, TimeRange};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No credential is present; the backend was never contacted.
    #[error("not logged in")]
    Unauthenticated,

    /// The backend rejected the credential. The message is user-displayable.
    #[error("credential rejected: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),

    /// Network failure, timeout, or an unusable backend response.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    /// Raw series payload a document renderer consumes to compose the
    /// paginated per-sensor PDF; page composition itself is external.
    PdfSourceData,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::PdfSourceData => "pdf-source-data",
        }
    }
}

/// Stateless request functions against the backend REST API. No local
/// retries; every error propagates to the caller. Authenticated operations
/// attach the current session token and fail with `Unauthenticated` before
/// touching the network when none is present.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// `POST /users/login`. The only unauthenticated operation.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError>;

    /// `GET /telemetry/latest`.
    async fn fetch_latest(&self) -> Result<TelemetrySnapshot, ClientError>;

    /// `GET /telemetry/history?startDate=..&endDate=..`.
    async fn fetch_history(&self, range: TimeRange) -> Result<TelemetrySeries, ClientError>;

    /// `POST /telemetry/{name}`. Fire-and-forget device command.
    async fn send_command(&self, name: &str) -> Result<CommandResponse, ClientError>;

    /// `GET /telemetry/export`. Raw bytes pass through untouched.
    async fn request_export(
        &self,
        range: TimeRange,
        format: ExportFormat,
    ) -> Result<Bytes, ClientError>;

    /// Direct-navigation export URL with the token in the query string,
    /// for downloads that bypass header-based auth.
    fn export_download_url(
        &self,
        range: TimeRange,
        format: ExportFormat,
    ) -> Result<String, ClientError>;
}
