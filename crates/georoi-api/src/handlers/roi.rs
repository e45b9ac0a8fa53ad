use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use georoi_geo::parse_roi_geometry;

use super::attachment;
use crate::dto::{
    CreateBBoxRequest, CreateGeoJsonRequest, RoiListItem, RoiListResponse, RoiResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_rois(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RoiListResponse>, ApiError> {
    let ids = state.roi_store.list_rois().await?;
    let items: Vec<RoiListItem> = ids.into_iter().map(RoiListItem::new).collect();

    Ok(Json(RoiListResponse {
        count: items.len(),
        items,
    }))
}

pub async fn create_roi_bbox(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBBoxRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoiResponse>), ApiError> {
    let Json(request) = payload?;
    request.bbox.validate()?;

    let record = state
        .roi_store
        .create_roi(&request.bbox.to_geometry(), request.name.as_deref())
        .await?;

    tracing::info!(roi_id = %record.roi_id, bbox = ?request.bbox, "Created ROI from bbox");

    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn create_roi_geojson(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateGeoJsonRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoiResponse>), ApiError> {
    let Json(request) = payload?;

    let geometry = parse_roi_geometry(request.geojson).map_err(|e| {
        tracing::info!(error = %e, "Rejected ROI geometry");
        ApiError::from(e)
    })?;

    let record = state.roi_store.create_roi(&geometry, request.name.as_deref()).await?;

    tracing::info!(roi_id = %record.roi_id, "Created ROI from GeoJSON");

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// The stored FeatureCollection, unchanged
pub async fn get_roi(
    State(state): State<Arc<AppState>>,
    Path(roi_id): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.roi_store.read_roi(&roi_id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

pub async fn download_roi(
    State(state): State<Arc<AppState>>,
    Path(roi_id): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.roi_store.read_roi(&roi_id).await?;
    Ok(attachment(bytes, &format!("{}.geojson", roi_id)))
}
