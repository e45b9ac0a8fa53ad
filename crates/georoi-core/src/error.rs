//! Error types for georoi

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoroiError {
    // Lookup errors
    #[error("ROI not found: {roi_id}")]
    RoiNotFound { roi_id: String },

    #[error("Intersection not computed yet for ROI {roi_id}")]
    IntersectionNotFound { roi_id: String },

    // Input errors
    #[error("Invalid GeoJSON: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Geospatial errors
    #[error("Projection error: {0}")]
    Projection(String),

    #[error("{format} error: {message}")]
    Format { format: String, message: String },

    #[error("Reference dataset not found at {path}")]
    ReferenceMissing { path: PathBuf },

    // Imagery platform errors
    #[error("Error initializing Earth Engine: {kind}: {message}")]
    ImageryInit { kind: String, message: String },

    #[error("Earth Engine request failed: {0}")]
    Remote(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeoroiError {
    /// Short name of the error kind, used when wrapping start-up failures.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoroiError::RoiNotFound { .. } => "RoiNotFound",
            GeoroiError::IntersectionNotFound { .. } => "IntersectionNotFound",
            GeoroiError::InvalidGeometry { .. } => "InvalidGeometry",
            GeoroiError::InvalidParameter { .. } => "InvalidParameter",
            GeoroiError::ConfigMissing { .. } => "ConfigMissing",
            GeoroiError::ConfigInvalid { .. } => "ConfigInvalid",
            GeoroiError::Projection(_) => "Projection",
            GeoroiError::Format { .. } => "Format",
            GeoroiError::ReferenceMissing { .. } => "ReferenceMissing",
            GeoroiError::ImageryInit { .. } => "ImageryInit",
            GeoroiError::Remote(_) => "Remote",
            GeoroiError::Io(_) => "Io",
            GeoroiError::Serialization(_) => "Serialization",
        }
    }

    /// Whether the error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GeoroiError::RoiNotFound { .. } | GeoroiError::IntersectionNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for GeoroiError {
    fn from(err: serde_json::Error) -> Self {
        GeoroiError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoroiError>;
