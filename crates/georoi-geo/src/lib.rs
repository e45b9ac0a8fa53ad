//! georoi geo - geometry validation, CRS transformation, reference data and overlay
//!
//! Everything here is synchronous and CPU/file bound; async callers should run
//! it on a blocking thread. [`reference::ReferenceLayer`] does that itself.

pub mod overlay;
pub mod reference;
pub mod transform;
pub mod validation;

pub use overlay::{
    intersect_roi, roi_geometries, roi_geometries_from_geojson, roi_union, OverlayFeature,
    OverlayResult,
};
pub use reference::{ReferenceDataset, ReferenceFeature, ReferenceLayer};
pub use transform::Reprojector;
pub use validation::{parse_roi_geometry, validate_roi_geometry};
