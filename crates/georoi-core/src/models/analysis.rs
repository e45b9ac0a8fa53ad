use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeoroiError;

pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Sentinel-2 surface reflectance starts in 2015
pub const MIN_YEAR: i32 = 2015;
pub const MAX_YEAR: i32 = 2035;

/// Scene-level cloud cover threshold in percent
pub const DEFAULT_CLOUD_PCT: u32 = 15;

/// Reject analysis years outside the supported range
pub fn validate_year(year: i32) -> Result<(), GeoroiError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(GeoroiError::InvalidParameter {
            field: "year".to_string(),
            reason: format!("must be between {} and {}, got {}", MIN_YEAR, MAX_YEAR, year),
        })
    }
}

/// Normalized difference index computed from Sentinel-2 bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    /// Water index, (B3 - B8) / (B3 + B8)
    #[default]
    Ndwi,
    /// Built-up index, (B11 - B8) / (B11 + B8)
    Ndbi,
}

impl SpectralIndex {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectralIndex::Ndwi => "ndwi",
            SpectralIndex::Ndbi => "ndbi",
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectralIndex {
    type Err = GeoroiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ndwi" => Ok(SpectralIndex::Ndwi),
            "ndbi" => Ok(SpectralIndex::Ndbi),
            _ => Err(GeoroiError::InvalidParameter {
                field: "index".to_string(),
                reason: format!("unknown index '{}', expected ndwi or ndbi", s),
            }),
        }
    }
}

/// Water and land area inside an ROI, in hectares
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaStats {
    pub water_ha: f64,
    pub land_ha: f64,
}

/// Round an area to two decimals for reporting
pub fn round_ha(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
