use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod pipeline;
mod routes;
mod warehouse;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::pipeline::source::AttendanceSource;
use crate::pipeline::transform::Transformer;
use crate::warehouse::mysql::MySqlWarehouse;
use crate::warehouse::{TableManager, Warehouse};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Daily rolling file under `LOG_DIR`, stdout otherwise.
fn init_tracing(config: &Config) -> WorkerGuard {
    let (writer, guard) = match &config.log_dir {
        Some(dir) => tracing_appender::non_blocking(rolling::daily(dir, "attendance-sync.log")),
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(config.log_level)
        .with_ansi(config.log_dir.is_none())
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    guard
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;
    let _guard = init_tracing(&config);

    info!(
        port = config.port,
        table = %config.destination_table,
        strategy = %config.load_strategy,
        "Server starting..."
    );

    // One pool for the whole process, closed after the server stops.
    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    let warehouse: Arc<dyn Warehouse> = Arc::new(MySqlWarehouse::new(pool.clone()));

    if !config.excluded_shifts.is_empty() {
        info!(shifts = ?config.excluded_shifts, "Excluding shifts from sync");
    }

    let source = Data::new(AttendanceSource::new(
        config.source_url.clone(),
        config.source_token.clone(),
    ));
    let transformer = Data::new(Transformer::new(
        config.excluded_shifts.clone(),
        config.origin_tag.clone(),
    ));
    let tables = Data::new(TableManager::new(
        warehouse,
        config.destination_table.clone(),
        config.load_strategy,
    ));

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets match
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(source.clone())
            .app_data(transformer.clone())
            .app_data(tables.clone())
            .configure(routes::configure)
    })
    .bind(config.server_addr())?
    .run()
    .await?;

    info!("Server stopped, closing database pool");
    pool.close().await;

    Ok(())
}
