use actix_web::{HttpResponse, web};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::error::SyncError;
use crate::pipeline::source::AttendanceSource;
use crate::pipeline::transform::Transformer;
use crate::warehouse::{TableManager, TableStatus};

/// Accepted for compatibility with existing callers; the sync always loads the full report.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SyncQuery {
    #[schema(example = "Acme")]
    pub empresa: Option<String>,
    #[schema(example = "2024-01-01")]
    pub fecha_inicio: Option<String>,
    #[schema(example = "2024-01-31")]
    pub fecha_fin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "success",
    "message": "Attendance data replaced in the destination table",
    "rows_inserted": 120,
    "table": "ww_data_upload_asistencia.Asistencias_ControlRoll",
    "original_records": 125,
    "processed_records": 120
}))]
pub struct SyncResponse {
    pub status: String,
    pub message: String,
    pub rows_inserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_records: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataStatusResponse {
    #[schema(example = "ww_data_upload_asistencia.Asistencias_ControlRoll")]
    pub table: String,
    #[schema(example = "table_exists")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_registros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-01-01T09:30:00", value_type = String, format = "date-time")]
    pub ultima_carga: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empresas_unicas: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Replace the destination table with the current vendor report
#[utoipa::path(
    post,
    path = "/sync-to-bigquery",
    params(SyncQuery),
    responses(
        (status = 200, description = "Table replaced, or nothing to load", body = SyncResponse),
        (status = 502, description = "Attendance API unreachable", body = Object, example = json!({
            "detail": "Failed to reach the attendance API: error sending request"
        })),
        (status = 500, description = "Parse, processing or table error", body = Object, example = json!({
            "detail": "Invalid date value `2024-01-01` in field `hora_ingreso_oficial` (expected DD-MM-YYYY HH:MM:SS)"
        }))
    ),
    tag = "Sync"
)]
pub async fn sync_attendance(
    source: web::Data<AttendanceSource>,
    transformer: web::Data<Transformer>,
    tables: web::Data<TableManager>,
    query: web::Query<SyncQuery>,
) -> Result<HttpResponse, SyncError> {
    let query = query.into_inner();
    info!(
        empresa = ?query.empresa,
        fecha_inicio = ?query.fecha_inicio,
        fecha_fin = ?query.fecha_fin,
        "Sync requested"
    );

    match run_sync(&source, &transformer, &tables).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(summary)),
        Err(e) => {
            error!(error = %e, "Sync failed");
            Err(e)
        }
    }
}

/// Fetch, transform, ensure the table and replace its rows.
async fn run_sync(
    source: &AttendanceSource,
    transformer: &Transformer,
    tables: &TableManager,
) -> Result<SyncResponse, SyncError> {
    let raw = source.fetch().await?;

    if raw.is_empty() {
        info!("Attendance API returned no records, nothing to load");
        return Ok(SyncResponse {
            status: "success".to_string(),
            message: "No records to load".to_string(),
            rows_inserted: 0,
            table: None,
            original_records: None,
            processed_records: None,
        });
    }

    let mut records = transformer.transform(&raw)?;

    if !tables.ensure_schema().await {
        return Err(SyncError::SchemaUnavailable);
    }

    transformer.stamp(&mut records, Utc::now().naive_utc());
    tables.replace_all(&records).await?;

    Ok(SyncResponse {
        status: "success".to_string(),
        message: "Attendance data replaced in the destination table".to_string(),
        rows_inserted: records.len(),
        table: Some(tables.table().to_string()),
        original_records: Some(raw.len()),
        processed_records: Some(records.len()),
    })
}

/// Report what the destination table currently holds
#[utoipa::path(
    get,
    path = "/data-status",
    responses(
        (status = 200, description = "Table state", body = DataStatusResponse),
        (status = 500, description = "Warehouse query failed", body = Object, example = json!({
            "detail": "Warehouse query failed: pool timed out while waiting for an open connection"
        }))
    ),
    tag = "Sync"
)]
pub async fn data_status(tables: web::Data<TableManager>) -> Result<HttpResponse, SyncError> {
    let table = tables.table().to_string();

    let status = tables.status().await.map_err(|e| {
        error!(error = %e, table = %table, "Failed to read table status");
        e
    })?;

    let body = match status {
        TableStatus::Missing => DataStatusResponse {
            table,
            status: "table_not_exists".to_string(),
            total_registros: None,
            ultima_carga: None,
            empresas_unicas: None,
            message: Some("The table does not exist yet".to_string()),
        },
        TableStatus::Present(summary) => DataStatusResponse {
            table,
            status: "table_exists".to_string(),
            total_registros: Some(summary.total_rows),
            ultima_carga: summary.last_load,
            empresas_unicas: Some(summary.distinct_clients),
            message: None,
        },
    };

    Ok(HttpResponse::Ok().json(body))
}
