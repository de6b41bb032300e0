use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while syncing or reading the destination table.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to reach the attendance API: {0}")]
    UpstreamUnavailable(String),

    #[error("Failed to parse the attendance API response: {0}")]
    MalformedResponse(String),

    #[error("Invalid numeric value `{value}` in field `{field}`")]
    InvalidNumericFormat { field: &'static str, value: String },

    #[error("Invalid date value `{value}` in field `{field}` (expected DD-MM-YYYY HH:MM:SS)")]
    InvalidDateFormat { field: &'static str, value: String },

    #[error("Record {record} is missing required field `{field}`")]
    MissingRequiredField { field: &'static str, record: usize },

    #[error("Failed to create or verify the destination table")]
    SchemaUnavailable,

    #[error("Warehouse query failed: {0}")]
    Warehouse(#[from] sqlx::Error),
}

impl ResponseError for SyncError {
    fn status_code(&self) -> StatusCode {
        match self {
            SyncError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "detail": self.to_string()
        }))
    }
}
