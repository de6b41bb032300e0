use crate::api::{health, sync};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health::health_check)))
        // POST /sync-to-bigquery
        .service(
            web::resource("/sync-to-bigquery").route(web::post().to(sync::sync_attendance)),
        )
        // GET /data-status
        .service(web::resource("/data-status").route(web::get().to(sync::data_status)));
}
