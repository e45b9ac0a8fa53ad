//! CRS transformation

use geo::{Coord, Geometry, MapCoords};
use georoi_core::error::{GeoroiError, Result};
use georoi_core::models::Crs;
use proj::Proj;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    match (&crs1.wkt, &crs2.wkt) {
        (None, None) => crs1.epsg == crs2.epsg,
        _ => crs1.definition() == crs2.definition(),
    }
}

/// Reprojects geometries between two fixed CRS.
///
/// Build once and reuse; creating the PROJ pipeline is the expensive part.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    // None when both sides are the same CRS
    proj: Option<Proj>,
}

impl Reprojector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let proj = if crs_match(from, to) {
            None
        } else {
            let from_def = from.definition();
            let to_def = to.definition();
            let proj = Proj::new_known_crs(&from_def, &to_def, None).map_err(|e| {
                GeoroiError::Projection(format!(
                    "Failed to create projection from {} to {}: {}",
                    from_def, to_def, e
                ))
            })?;
            Some(proj)
        };

        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            proj,
        })
    }

    pub fn source(&self) -> &Crs {
        &self.from
    }

    pub fn target(&self) -> &Crs {
        &self.to
    }

    /// Transform every coordinate of a geometry
    pub fn apply(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        let Some(proj) = &self.proj else {
            return Ok(geometry.clone());
        };

        geometry
            .try_map_coords(|c: Coord<f64>| {
                proj.convert((c.x, c.y)).map(|(x, y)| Coord { x, y })
            })
            .map_err(|e| GeoroiError::Projection(format!("Projection failed: {}", e)))
    }
}

/// Reproject a single geometry from one CRS to another
pub fn reproject_geometry(geometry: &Geometry<f64>, from: &Crs, to: &Crs) -> Result<Geometry<f64>> {
    Reprojector::new(from, to)?.apply(geometry)
}
