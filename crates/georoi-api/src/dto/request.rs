use georoi_core::models::{BBox, SpectralIndex, DEFAULT_CLOUD_PCT};
use serde::Deserialize;

fn default_cloud_pct() -> u32 {
    DEFAULT_CLOUD_PCT
}

/// ROI from a bounding box
#[derive(Debug, Deserialize)]
pub struct CreateBBoxRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub bbox: BBox,
}

/// ROI from a GeoJSON geometry (EPSG:4326)
#[derive(Debug, Deserialize)]
pub struct CreateGeoJsonRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub geojson: serde_json::Value,
}

/// Analysis parameters. The year range is checked after the ROI lookup.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub year: i32,
    #[serde(default)]
    pub index: SpectralIndex,
    #[serde(default = "default_cloud_pct")]
    pub cloud_pct: u32,
}

/// Index preview query string. Unknown index names fall back to NDWI.
#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub year: i32,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default = "default_cloud_pct")]
    pub cloud_pct: u32,
}

impl IndexQuery {
    pub fn spectral_index(&self) -> SpectralIndex {
        self.index.as_deref().and_then(|i| i.parse().ok()).unwrap_or_default()
    }
}
