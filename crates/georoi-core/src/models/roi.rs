//! Region of interest records.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A stored ROI as reported back to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiRecord {
    pub roi_id: String,
    pub name: Option<String>,
    pub path: PathBuf,
}

/// Generate a fresh ROI id
pub fn new_roi_id() -> String {
    Uuid::new_v4().to_string()
}

/// Ids are generated, so anything outside `[A-Za-z0-9_-]` cannot name a stored ROI.
/// Checking this up front also keeps path segments out of file names.
pub fn is_valid_roi_id(roi_id: &str) -> bool {
    !roi_id.is_empty()
        && roi_id.len() <= 128
        && roi_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
