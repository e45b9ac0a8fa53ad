pub mod analysis;
pub mod geometry;
pub mod roi;

pub use analysis::{
    round_ha, validate_year, AreaStats, SpectralIndex, DEFAULT_CLOUD_PCT, MAX_YEAR, MIN_YEAR,
    SQUARE_METERS_PER_HECTARE,
};
pub use geometry::{BBox, Crs};
pub use roi::{is_valid_roi_id, new_roi_id, RoiRecord};
