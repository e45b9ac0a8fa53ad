use geo::MultiPolygon;
use geojson::GeoJson;
use georoi_geo::roi_geometries_from_geojson;

use crate::error::ApiError;
use crate::state::AppState;

/// Service for reading stored ROIs back as geometry
pub struct RoiService;

impl RoiService {
    /// Polygonal parts of a stored ROI, one per feature
    pub async fn load_parts(
        state: &AppState,
        roi_id: &str,
    ) -> Result<Vec<MultiPolygon<f64>>, ApiError> {
        let bytes = state.roi_store.read_roi(roi_id).await?;

        let document: GeoJson = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(roi_id = %roi_id, error = %e, "Stored ROI is not GeoJSON");
            ApiError::internal("Stored ROI is unreadable").with_details(e.to_string())
        })?;

        roi_geometries_from_geojson(&document).map_err(|e| {
            tracing::error!(roi_id = %roi_id, error = %e, "Stored ROI has unusable geometry");
            ApiError::internal("Stored ROI is unreadable").with_details(e.to_string())
        })
    }
}
