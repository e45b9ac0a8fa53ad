use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use georoi_core::models::round_ha;

use super::attachment;
use crate::dto::IntersectResponse;
use crate::error::ApiError;
use crate::services::{OverlayService, RoiService};
use crate::state::AppState;

/// Overlay the ROI with the reference dataset and store the result.
/// An empty overlap still writes an (empty) output file.
pub async fn compute_intersection(
    State(state): State<Arc<AppState>>,
    Path(roi_id): Path<String>,
) -> Result<Json<IntersectResponse>, ApiError> {
    let parts = RoiService::load_parts(&state, &roi_id).await?;
    let overlay = OverlayService::intersect(&state, parts).await?;

    let output_path = state
        .intersection_store
        .save_intersection(&roi_id, &overlay.to_feature_collection())
        .await?;

    let total_area_ha = round_ha(overlay.total_area_ha());
    tracing::info!(
        roi_id = %roi_id,
        features = overlay.len(),
        total_area_ha,
        "Computed intersection"
    );

    Ok(Json(IntersectResponse {
        roi_id,
        rdtr_features: overlay.len(),
        total_area_ha,
        output_path: output_path.display().to_string(),
    }))
}

pub async fn download_intersection(
    State(state): State<Arc<AppState>>,
    Path(roi_id): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.intersection_store.read_intersection(&roi_id).await?;
    Ok(attachment(bytes, &format!("{}_rdtr.geojson", roi_id)))
}
