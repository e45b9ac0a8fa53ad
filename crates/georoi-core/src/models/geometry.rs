//! Coordinate reference systems and bounding boxes.

use geojson::{Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::error::{GeoroiError, Result};

/// Coordinate Reference System identified by EPSG code, or by WKT when no code is known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    /// 0 for a CRS known only from its WKT
    pub epsg: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self {
            epsg,
            name: name.into(),
            wkt: None,
        }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// A metric CRS given only by its code, e.g. a UTM zone
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            32601..=32660 => Self::new(epsg, format!("WGS 84 / UTM zone {}N", epsg - 32600)),
            32701..=32760 => Self::new(epsg, format!("WGS 84 / UTM zone {}S", epsg - 32700)),
            _ => Self::new(epsg, format!("EPSG:{}", epsg)),
        }
    }

    /// A CRS carrying a WKT definition with no EPSG code, as in ESRI `.prj` files
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into().trim().to_string();
        let name = wkt
            .split('"')
            .nth(1)
            .filter(|name| !name.is_empty())
            .unwrap_or("custom")
            .to_string();
        Self {
            epsg: 0,
            name,
            wkt: Some(wkt),
        }
    }

    /// PROJ definition string
    pub fn definition(&self) -> String {
        match &self.wkt {
            Some(wkt) => wkt.clone(),
            None => format!("EPSG:{}", self.epsg),
        }
    }
}

/// Axis-aligned box in geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Reject non-finite corners and boxes with no extent on an axis
    pub fn validate(&self) -> Result<()> {
        let corners = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(GeoroiError::InvalidGeometry {
                reason: "bounding box coordinates must be finite".to_string(),
            });
        }
        if self.min_lon >= self.max_lon {
            return Err(GeoroiError::InvalidGeometry {
                reason: format!(
                    "min_lon ({}) must be less than max_lon ({})",
                    self.min_lon, self.max_lon
                ),
            });
        }
        if self.min_lat >= self.max_lat {
            return Err(GeoroiError::InvalidGeometry {
                reason: format!(
                    "min_lat ({}) must be less than max_lat ({})",
                    self.min_lat, self.max_lat
                ),
            });
        }
        Ok(())
    }

    /// Closed exterior ring, counter-clockwise from the south-west corner
    pub fn ring(&self) -> Vec<Vec<f64>> {
        vec![
            vec![self.min_lon, self.min_lat],
            vec![self.max_lon, self.min_lat],
            vec![self.max_lon, self.max_lat],
            vec![self.min_lon, self.max_lat],
            vec![self.min_lon, self.min_lat],
        ]
    }

    /// The box as a GeoJSON Polygon geometry
    pub fn to_geometry(&self) -> Geometry {
        Geometry::new(Value::Polygon(vec![self.ring()]))
    }
}
