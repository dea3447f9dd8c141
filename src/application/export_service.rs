// Export service - download telemetry exports to local files
use crate::application::telemetry_client::{ClientError, ExportFormat, TelemetryClient};
use crate::domain::telemetry::TimeRange;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_EXPORT_FILENAME: &str = "telemetry_export.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("writing export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches an export payload and writes it to disk. The CSV bytes are an
/// untouched pass-through from the backend; `pdf-source-data` is the raw
/// series an external document renderer consumes.
#[derive(Clone)]
pub struct ExportService {
    client: Arc<dyn TelemetryClient>,
}

impl ExportService {
    pub fn new(client: Arc<dyn TelemetryClient>) -> Self {
        Self { client }
    }

    /// Download the export for `range` into `path`, returning the number of
    /// bytes written.
    pub async fn export_to_file(
        &self,
        range: TimeRange,
        format: ExportFormat,
        path: &Path,
    ) -> Result<u64, ExportError> {
        let payload = self.client.request_export(range, format).await?;
        tokio::fs::write(path, &payload).await?;
        tracing::info!(
            "wrote {} byte {} export to {}",
            payload.len(),
            format.as_str(),
            path.display()
        );
        Ok(payload.len() as u64)
    }

    /// Direct-navigation URL for the same download (token in the query).
    pub fn download_url(
        &self,
        range: TimeRange,
        format: ExportFormat,
    ) -> Result<String, ClientError> {
        self.client.export_download_url(range, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::telemetry_client::{CommandResponse, LoginResponse};
    use crate::domain::telemetry::{TelemetrySeries, TelemetrySnapshot};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;

    struct FixedExport(&'static [u8]);

    #[async_trait]
    impl TelemetryClient for FixedExport {
        async fn login(&self, _: &str, _: &str) -> Result<LoginResponse, ClientError> {
            unimplemented!()
        }
        async fn fetch_latest(&self) -> Result<TelemetrySnapshot, ClientError> {
            unimplemented!()
        }
        async fn fetch_history(&self, _: TimeRange) -> Result<TelemetrySeries, ClientError> {
            unimplemented!()
        }
        async fn send_command(&self, _: &str) -> Result<CommandResponse, ClientError> {
            unimplemented!()
        }
        async fn request_export(
            &self,
            _: TimeRange,
            _: ExportFormat,
        ) -> Result<Bytes, ClientError> {
            Ok(Bytes::from_static(self.0))
        }
        fn export_download_url(&self, _: TimeRange, _: ExportFormat) -> Result<String, ClientError> {
            Err(ClientError::Unauthenticated)
        }
    }

    #[tokio::test]
    async fn export_bytes_pass_through_untouched() {
        let payload = b"time,coolant_temperature\n2025-06-01T14:00:00Z,85.5\n";
        let service = ExportService::new(Arc::new(FixedExport(payload)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_FILENAME);
        let range = TimeRange::last_hours(Utc::now(), 1);

        let written = service
            .export_to_file(range, ExportFormat::Csv, &path)
            .await
            .unwrap();

        assert_eq!(written, payload.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }
}
