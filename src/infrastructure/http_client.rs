// HTTP adapter for the team's telemetry backend
use crate::application::session_service::TokenCell;
use crate::application::telemetry_client::{
    ClientError, CommandResponse, ExportFormat, LoginResponse, TelemetryClient,
};
use crate::domain::telemetry::{TelemetrySeries, TelemetrySnapshot, TimeRange};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HttpTelemetryClient {
    base_url: String,
    http: reqwest::Client,
    token: TokenCell,
}

impl HttpTelemetryClient {
    pub fn new(
        base_url: String,
        request_timeout: Duration,
        token: TokenCell,
    ) -> anyhow::Result<Self> {
        // The timeout bounds every request so a dead backend can never pin
        // a view in Loading.
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer_token(&self) -> Result<String, ClientError> {
        self.token.get().ok_or(ClientError::Unauthenticated)
    }

    /// Map the response status into the error taxonomy. 401/403 is
    /// `Unauthorized` with the backend's message when it sends one; any
    /// other failure is `Unreachable`.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| "credential rejected by backend".to_string());
            return Err(ClientError::Unauthorized(message));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Unreachable(format!(
                "backend returned {status}: {body}"
            )));
        }
        Ok(response)
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Unreachable(err.to_string())
}

#[async_trait]
impl TelemetryClient for HttpTelemetryClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/users/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response)
            .await?
            .json::<LoginResponse>()
            .await
            .map_err(transport_error)
    }

    async fn fetch_latest(&self) -> Result<TelemetrySnapshot, ClientError> {
        let token = self.bearer_token()?;
        let response = self
            .http
            .get(self.url("/telemetry/latest"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response)
            .await?
            .json::<TelemetrySnapshot>()
            .await
            .map_err(transport_error)
    }

    async fn fetch_history(&self, range: TimeRange) -> Result<TelemetrySeries, ClientError> {
        let token = self.bearer_token()?;
        let response = self
            .http
            .get(self.url("/telemetry/history"))
            .query(&[
                ("startDate", range.start().to_rfc3339()),
                ("endDate", range.end().to_rfc3339()),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response)
            .await?
            .json::<TelemetrySeries>()
            .await
            .map_err(transport_error)
    }

    async fn send_command(&self, name: &str) -> Result<CommandResponse, ClientError> {
        let token = self.bearer_token()?;
        let response = self
            .http
            .post(self.url(&format!("/telemetry/{name}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response)
            .await?
            .json::<CommandResponse>()
            .await
            .map_err(transport_error)
    }

    async fn request_export(
        &self,
        range: TimeRange,
        format: ExportFormat,
    ) -> Result<Bytes, ClientError> {
        let token = self.bearer_token()?;
        let response = self
            .http
            .get(self.url("/telemetry/export"))
            .query(&[
                ("startDate", range.start().to_rfc3339()),
                ("endDate", range.end().to_rfc3339()),
                ("format", format.as_str().to_string()),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response)
            .await?
            .bytes()
            .await
            .map_err(transport_error)
    }

    fn export_download_url(
        &self,
        range: TimeRange,
        format: ExportFormat,
    ) -> Result<String, ClientError> {
        let token = self.bearer_token()?;
        Ok(format!(
            "{}?startDate={}&endDate={}&format={}&token={}",
            self.url("/telemetry/export"),
            urlencoding::encode(&range.start().to_rfc3339()),
            urlencoding::encode(&range.end().to_rfc3339()),
            format.as_str(),
            urlencoding::encode(&token),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn client(cell: TokenCell) -> HttpTelemetryClient {
        HttpTelemetryClient::new(
            "http://backend.invalid/api/".to_string(),
            Duration::from_secs(1),
            cell,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn authenticated_calls_fail_fast_without_a_token() {
        let client = client(TokenCell::default());
        let range = TimeRange::last_hours(Utc::now(), 1);

        assert!(matches!(
            client.fetch_latest().await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(
            client.fetch_history(range).await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(
            client.send_command("pit-call").await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(
            client.request_export(range, ExportFormat::Csv).await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(
            client.export_download_url(range, ExportFormat::Csv),
            Err(ClientError::Unauthenticated)
        ));
    }

    #[test]
    fn export_url_carries_encoded_range_and_token() {
        let cell = TokenCell::default();
        cell.set(Some("tok/with=reserved".to_string()));
        let client = client(cell);

        let start = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap();
        let range = TimeRange::new(start, end).unwrap();

        let url = client.export_download_url(range, ExportFormat::Csv).unwrap();
        assert!(url.starts_with("http://backend.invalid/api/telemetry/export?"));
        assert!(url.contains("startDate=2025-06-01T13%3A00%3A00%2B00%3A00"));
        assert!(url.contains("endDate=2025-06-01T14%3A00%3A00%2B00%3A00"));
        assert!(url.contains("format=csv"));
        assert!(url.contains("token=tok%2Fwith%3Dreserved"));
    }
}
