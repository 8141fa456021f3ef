pub mod handlers;

pub use handlers::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let import_routes = Router::new()
        .route("/api/import/invoices", post(import_invoices))
        .route("/api/import/upload", post(upload_invoices))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES));

    let maintenance_routes = Router::new()
        .route("/api/maintenance/reassign", post(reassign_invoices))
        .route("/api/maintenance/recalculate-totals", post(recalculate_totals))
        .route("/api/maintenance/vat-correction", post(vat_correction));

    Router::new()
        .route("/health", get(health_check))
        .merge(import_routes)
        .merge(maintenance_routes)
        .fallback(not_found)
        .with_state(state)
}
