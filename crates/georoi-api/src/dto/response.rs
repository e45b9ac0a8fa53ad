use georoi_core::models::{RoiRecord, SpectralIndex};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl Default for StatusResponse {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// Created ROI
#[derive(Debug, Serialize)]
pub struct RoiResponse {
    pub roi_id: String,
    pub name: Option<String>,
    pub path: String,
}

impl From<RoiRecord> for RoiResponse {
    fn from(record: RoiRecord) -> Self {
        Self {
            roi_id: record.roi_id,
            name: record.name,
            path: record.path.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoiListItem {
    pub roi_id: String,
    pub download: String,
}

impl RoiListItem {
    pub fn new(roi_id: String) -> Self {
        let download = format!("/roi/{}/download", roi_id);
        Self { roi_id, download }
    }
}

#[derive(Debug, Serialize)]
pub struct RoiListResponse {
    pub count: usize,
    pub items: Vec<RoiListItem>,
}

/// Water/land statistics for one year, areas in hectares
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub year: i32,
    pub index: SpectralIndex,
    pub area_water_ha: f64,
    pub area_land_ha: f64,
    pub area_land_in_conservation_ha: f64,
}

/// Conservation-zone overlay summary
#[derive(Debug, Serialize)]
pub struct IntersectResponse {
    pub roi_id: String,
    pub rdtr_features: usize,
    pub total_area_ha: f64,
    pub output_path: String,
}
