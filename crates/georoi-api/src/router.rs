use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/status", get(handlers::status))
        // ROIs
        .route("/roi", get(handlers::list_rois))
        .route("/roi/bbox", post(handlers::create_roi_bbox))
        .route("/roi/geojson", post(handlers::create_roi_geojson))
        .route("/roi/{roi_id}", get(handlers::get_roi))
        .route("/roi/{roi_id}/download", get(handlers::download_roi))
        // Analysis
        .route("/roi/{roi_id}/analyze", post(handlers::analyze_roi))
        .route("/roi/{roi_id}/index", get(handlers::index_preview))
        // Intersection
        .route("/roi/{roi_id}/intersection", post(handlers::compute_intersection))
        .route("/intersection/{roi_id}/download", get(handlers::download_intersection))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
