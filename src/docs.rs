use crate::api::health::HealthResponse;
use crate::api::sync::{DataStatusResponse, SyncQuery, SyncResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Sync API",
        version = "0.1.0",
        description = r#"
## Attendance Sync

Pulls the ControlRoll attendance report and replaces the contents of the
attendance table with it.

- `POST /sync-to-bigquery` fetches, normalizes and reloads the whole table
- `GET /data-status` reports row count, last load time and distinct clients
- `GET /` is a liveness probe

Every sync is a full replace: the table only ever holds the latest report.
"#,
    ),
    paths(
        crate::api::health::health_check,
        crate::api::sync::sync_attendance,
        crate::api::sync::data_status
    ),
    components(
        schemas(
            HealthResponse,
            SyncQuery,
            SyncResponse,
            DataStatusResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Sync", description = "Attendance table load and status"),
    )
)]
pub struct ApiDoc;
