//! Filesystem storage: one GeoJSON file per ROI and per overlay result.
//!
//! There is no locking. ROI files never collide because ids are generated;
//! concurrent overlay writes for the same ROI leave the last writer's file.

use async_trait::async_trait;
use geojson::{Feature, FeatureCollection, Geometry};
use georoi_core::error::{GeoroiError, Result};
use georoi_core::models::{is_valid_roi_id, new_roi_id, RoiRecord};
use georoi_core::Settings;
use serde_json::{json, Map};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ports::{IntersectionStore, RoiStore};

const ROI_SUFFIX: &str = ".geojson";
const INTERSECTION_SUFFIX: &str = "_rdtr.geojson";

#[derive(Debug, Clone)]
pub struct FileStore {
    roi_dir: PathBuf,
    intersect_dir: PathBuf,
}

impl FileStore {
    pub fn new(roi_dir: impl Into<PathBuf>, intersect_dir: impl Into<PathBuf>) -> Self {
        Self {
            roi_dir: roi_dir.into(),
            intersect_dir: intersect_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.roi_dir, &settings.intersect_dir)
    }

    pub fn roi_dir(&self) -> &Path {
        &self.roi_dir
    }

    pub fn intersect_dir(&self) -> &Path {
        &self.intersect_dir
    }
}

/// Read a whole file, mapping "does not exist" to the given error
async fn read_or(path: &Path, not_found: GeoroiError) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found),
        Err(e) => Err(GeoroiError::Io(e)),
    }
}

#[async_trait]
impl RoiStore for FileStore {
    async fn create_roi(&self, geometry: &Geometry, name: Option<&str>) -> Result<RoiRecord> {
        let roi_id = new_roi_id();
        let path = self.roi_path(&roi_id);

        let mut properties = Map::new();
        properties.insert("name".to_string(), json!(name.unwrap_or(&roi_id)));

        let collection = FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry.clone()),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }],
            foreign_members: None,
        };

        let body = serde_json::to_vec(&collection)?;
        tokio::fs::write(&path, body).await?;

        tracing::info!(roi_id = %roi_id, path = %path.display(), "Stored ROI");

        Ok(RoiRecord {
            roi_id,
            name: name.map(str::to_string),
            path,
        })
    }

    async fn read_roi(&self, roi_id: &str) -> Result<Vec<u8>> {
        let not_found = GeoroiError::RoiNotFound {
            roi_id: roi_id.to_string(),
        };
        if !is_valid_roi_id(roi_id) {
            return Err(not_found);
        }
        read_or(&self.roi_path(roi_id), not_found).await
    }

    async fn list_rois(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.roi_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GeoroiError::Io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(roi_id) = file_name.strip_suffix(ROI_SUFFIX) {
                ids.push(roi_id.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn roi_path(&self, roi_id: &str) -> PathBuf {
        self.roi_dir.join(format!("{}{}", roi_id, ROI_SUFFIX))
    }
}

#[async_trait]
impl IntersectionStore for FileStore {
    async fn save_intersection(&self, roi_id: &str, result: &FeatureCollection) -> Result<PathBuf> {
        let path = self.intersection_path(roi_id);
        let body = serde_json::to_vec(result)?;
        tokio::fs::write(&path, body).await?;

        tracing::info!(
            roi_id = %roi_id,
            features = result.features.len(),
            path = %path.display(),
            "Stored intersection result"
        );

        Ok(path)
    }

    async fn read_intersection(&self, roi_id: &str) -> Result<Vec<u8>> {
        let not_found = GeoroiError::IntersectionNotFound {
            roi_id: roi_id.to_string(),
        };
        if !is_valid_roi_id(roi_id) {
            return Err(not_found);
        }
        read_or(&self.intersection_path(roi_id), not_found).await
    }

    fn intersection_path(&self, roi_id: &str) -> PathBuf {
        self.intersect_dir.join(format!("{}{}", roi_id, INTERSECTION_SUFFIX))
    }
}
