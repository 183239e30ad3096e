use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize + MULTIPART_OVERHEAD;

    Router::new()
        // Site configuration
        .route("/api/config", get(handlers::get_config))
        .route("/api/config/save", post(handlers::save_config))
        .route("/api/config/save-live", post(handlers::save_and_make_live))
        .route("/api/config/make-live", post(handlers::make_live))
        .route("/api/config/validate", post(handlers::validate_config))
        .route("/api/config/staging", get(handlers::list_staging))
        .route("/api/config/staging/:name", get(handlers::load_staging))
        .route("/api/config/staging/:name", delete(handlers::delete_staging))
        .route(
            "/api/config/import",
            post(handlers::import_config).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/config/export/:name", get(handlers::export_config))
        // Schemas
        .route("/api/schema", get(handlers::list_schemas))
        .route("/api/schema/:widget", get(handlers::get_schema))
        .route(
            "/api/schema/:widget/validate",
            post(handlers::validate_fragment),
        )
        // Home Assistant entities
        .route("/api/validate/entity", post(handlers::validate_entity))
        .route("/api/entities/:domain", get(handlers::list_entities))
        // Slideshow assets
        .route("/api/assets", get(handlers::list_assets))
        .route(
            "/api/assets",
            post(handlers::upload_asset).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Internal
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
