use geo::MultiPolygon;
use georoi_core::models::Crs;
use georoi_geo::{intersect_roi, OverlayResult};

use crate::error::ApiError;
use crate::state::AppState;

/// Service for overlaying ROIs with the reference dataset
pub struct OverlayService;

impl OverlayService {
    /// Intersect ROI parts with the reference dataset, loading it on first use
    pub async fn intersect(
        state: &AppState,
        parts: Vec<MultiPolygon<f64>>,
    ) -> Result<OverlayResult, ApiError> {
        let dataset = state.reference.get().await?;
        let metric_crs = Crs::from_epsg(state.settings.default_utm_epsg);

        let result =
            tokio::task::spawn_blocking(move || intersect_roi(&dataset, &parts, &metric_crs))
                .await
                .map_err(|e| {
                    ApiError::internal("Overlay task failed").with_details(e.to_string())
                })??;

        Ok(result)
    }
}
