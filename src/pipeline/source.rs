use reqwest::Client;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::model::attendance::RawAttendanceRecord;

/// Client for the vendor attendance report endpoint.
#[derive(Clone, Debug)]
pub struct AttendanceSource {
    http: Client,
    url: String,
    token: Option<String>,
}

impl AttendanceSource {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        let url = url.into();
        if token.is_none() {
            warn!(%url, "TOKEN_CR is not set, requests will carry no token");
        }
        Self {
            http: Client::new(),
            url,
            token,
        }
    }

    /// Single GET of the full attendance report.
    pub async fn fetch(&self) -> Result<Vec<RawAttendanceRecord>, SyncError> {
        info!(url = %self.url, "Calling attendance API");

        let mut request = self.http.get(&self.url).header("method", "report");
        if let Some(token) = &self.token {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SyncError::UpstreamUnavailable(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::UpstreamUnavailable(e.to_string()))?;

        let records: Vec<RawAttendanceRecord> = serde_json::from_str(&body)
            .map_err(|e| SyncError::MalformedResponse(e.to_string()))?;

        info!(records = records.len(), "Attendance records fetched");
        Ok(records)
    }
}
