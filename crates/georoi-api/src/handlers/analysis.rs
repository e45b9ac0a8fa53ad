use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use georoi_core::models::{round_ha, validate_year};
use georoi_geo::roi_union;
use georoi_imagery::IndexPreview;

use crate::dto::{AnalyzeRequest, AnalyzeResponse, IndexQuery};
use crate::error::ApiError;
use crate::services::{OverlayService, RoiService};
use crate::state::AppState;

/// Water/land areas from the annual NDWI composite, plus the land area
/// inside conservation zones from the vector overlay
pub async fn analyze_roi(
    State(state): State<Arc<AppState>>,
    Path(roi_id): Path<String>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    // Unknown ROIs are reported before any problem with the parameters
    let parts = RoiService::load_parts(&state, &roi_id).await?;
    let Json(request) = payload?;
    validate_year(request.year)?;

    tracing::info!(
        roi_id = %roi_id,
        year = request.year,
        cloud_pct = request.cloud_pct,
        "Analyzing ROI"
    );

    let region = roi_union(&parts);
    let stats = state.imagery.area_stats(&region, request.year, request.cloud_pct).await?;

    let overlay = OverlayService::intersect(&state, parts).await?;

    Ok(Json(AnalyzeResponse {
        year: request.year,
        index: request.index,
        area_water_ha: round_ha(stats.water_ha),
        area_land_ha: round_ha(stats.land_ha),
        area_land_in_conservation_ha: round_ha(overlay.total_area_ha()),
    }))
}

pub async fn index_preview(
    State(state): State<Arc<AppState>>,
    Path(roi_id): Path<String>,
    query: Result<Query<IndexQuery>, QueryRejection>,
) -> Result<Json<IndexPreview>, ApiError> {
    let parts = RoiService::load_parts(&state, &roi_id).await?;
    let Query(query) = query?;
    let index = query.spectral_index();

    tracing::info!(roi_id = %roi_id, year = query.year, index = %index, "Building index preview");

    let region = roi_union(&parts);
    let preview = state.imagery.preview(&region, query.year, index, query.cloud_pct).await?;

    Ok(Json(preview))
}
