mod analysis;
mod health;
mod intersection;
mod roi;

pub use analysis::{analyze_roi, index_preview};
pub use health::status;
pub use intersection::{compute_intersection, download_intersection};
pub use roi::{create_roi_bbox, create_roi_geojson, download_roi, get_roi, list_rois};

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

pub(crate) const GEOJSON_MEDIA_TYPE: &str = "application/geo+json";

/// Stored GeoJSON returned as a file download
pub(crate) fn attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, GEOJSON_MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        bytes,
    )
        .into_response()
}
