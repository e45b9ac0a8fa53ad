use async_trait::async_trait;
use geojson::{FeatureCollection, Geometry};
use georoi_core::error::Result;
use georoi_core::models::RoiRecord;
use std::path::PathBuf;

/// Port for ROI persistence
#[async_trait]
pub trait RoiStore: Send + Sync {
    /// Persist a geometry under a freshly generated id.
    /// The feature's `name` property defaults to the id.
    async fn create_roi(&self, geometry: &Geometry, name: Option<&str>) -> Result<RoiRecord>;

    /// The stored document exactly as written
    async fn read_roi(&self, roi_id: &str) -> Result<Vec<u8>>;

    /// Ids of every stored ROI, sorted
    async fn list_rois(&self) -> Result<Vec<String>>;

    /// Where an ROI lives (or would live)
    fn roi_path(&self, roi_id: &str) -> PathBuf;
}

/// Port for overlay output persistence
#[async_trait]
pub trait IntersectionStore: Send + Sync {
    /// Write the result for an ROI, replacing any earlier one
    async fn save_intersection(&self, roi_id: &str, result: &FeatureCollection) -> Result<PathBuf>;

    /// The stored result document
    async fn read_intersection(&self, roi_id: &str) -> Result<Vec<u8>>;

    fn intersection_path(&self, roi_id: &str) -> PathBuf;
}
