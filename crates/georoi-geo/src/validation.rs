//! ROI geometry validation

use geojson::{Geometry, Value};
use georoi_core::error::{GeoroiError, Result};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// Convert into the crate error, keeping the first problem found
    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(GeoroiError::InvalidGeometry {
                reason: if first.location.is_empty() {
                    first.reason
                } else {
                    format!("{}: {}", first.location, first.reason)
                },
            }),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Parse an arbitrary JSON value as a GeoJSON geometry and validate it as an ROI
pub fn parse_roi_geometry(value: serde_json::Value) -> Result<Geometry> {
    let geometry: Geometry = serde_json::from_value(value).map_err(|e| {
        GeoroiError::InvalidGeometry { reason: format!("not a GeoJSON geometry ({})", e) }
    })?;
    validate_roi_geometry(&geometry)?;
    Ok(geometry)
}

/// An ROI must be a non-empty Polygon or MultiPolygon with usable rings
pub fn validate_roi_geometry(geometry: &Geometry) -> Result<()> {
    if is_empty(&geometry.value) {
        return Err(GeoroiError::InvalidGeometry {
            reason: "geometry is empty".to_string(),
        });
    }

    let result = match &geometry.value {
        Value::Polygon(rings) => validate_polygon(rings, "Polygon"),
        Value::MultiPolygon(polygons) => {
            let mut result = ValidationResult::valid();
            for (i, rings) in polygons.iter().enumerate() {
                for error in validate_polygon(rings, "Polygon").errors {
                    result.add_error(
                        format!("MultiPolygon[{}].{}", i, error.location),
                        error.reason,
                    );
                }
            }
            result
        }
        other => {
            let mut result = ValidationResult::valid();
            result.add_error(
                String::new(),
                format!("geometry must be Polygon or MultiPolygon, got {}", type_name(other)),
            );
            result
        }
    };

    result.into_result()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Point(p) => p.is_empty(),
        Value::MultiPoint(points) => points.is_empty(),
        Value::LineString(line) => line.is_empty(),
        Value::MultiLineString(lines) => lines.iter().all(|l| l.is_empty()),
        Value::Polygon(rings) => rings.first().map_or(true, |r| r.is_empty()),
        Value::MultiPolygon(polygons) => {
            polygons.iter().all(|rings| rings.first().map_or(true, |r| r.is_empty()))
        }
        Value::GeometryCollection(geoms) => geoms.iter().all(|g| is_empty(&g.value)),
    }
}

fn validate_polygon(rings: &[Vec<Vec<f64>>], label: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if rings.is_empty() {
        result.add_error(label.to_string(), "polygon has no rings".to_string());
        return result;
    }

    for (i, ring) in rings.iter().enumerate() {
        let location = if i == 0 {
            format!("{} exterior", label)
        } else {
            format!("{} interior[{}]", label, i - 1)
        };

        if let Some(bad) = ring.iter().position(|pos| pos.len() < 2) {
            result.add_error(location, format!("position {} has fewer than 2 coordinates", bad));
            continue;
        }

        if ring.iter().any(|pos| !pos[0].is_finite() || !pos[1].is_finite()) {
            result.add_error(location, "coordinates must be finite".to_string());
            continue;
        }

        // Unclosed rings are closed implicitly, as GEOS-based tools do
        let closed = ring.first().map(|p| &p[..2]) == ring.last().map(|p| &p[..2]);
        let count = if closed { ring.len() } else { ring.len() + 1 };
        if count < 4 {
            result.add_error(
                location,
                format!("a linear ring requires at least 4 coordinates, found {}", count),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reason(err: GeoroiError) -> String {
        match err {
            GeoroiError::InvalidGeometry { reason } => reason,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_valid_polygon() {
        let geom = parse_roi_geometry(json!({
            "type": "Polygon",
            "coordinates": [[[106.0, -6.5], [106.2, -6.5], [106.2, -6.3], [106.0, -6.5]]]
        }));
        assert!(geom.is_ok());
    }

    #[test]
    fn test_valid_multipolygon() {
        let geom = parse_roi_geometry(json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]]
            ]
        }));
        assert!(geom.is_ok());
    }

    #[test]
    fn test_point_rejected_with_type_name() {
        let err = parse_roi_geometry(json!({"type": "Point", "coordinates": [106.0, -6.5]}))
            .unwrap_err();
        assert!(reason(err).contains("Polygon or MultiPolygon, got Point"));
    }

    #[test]
    fn test_empty_polygon_rejected() {
        let err = parse_roi_geometry(json!({"type": "Polygon", "coordinates": []})).unwrap_err();
        assert_eq!(reason(err), "geometry is empty");

        let err =
            parse_roi_geometry(json!({"type": "MultiPolygon", "coordinates": []})).unwrap_err();
        assert_eq!(reason(err), "geometry is empty");
    }

    #[test]
    fn test_short_ring_rejected() {
        let err = parse_roi_geometry(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        }))
        .unwrap_err();
        assert!(reason(err).contains("at least 4 coordinates"));
    }

    #[test]
    fn test_unclosed_triangle_accepted() {
        let geom = parse_roi_geometry(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]
        }));
        assert!(geom.is_ok());
    }

    #[test]
    fn test_not_geojson_rejected() {
        let err = parse_roi_geometry(json!({"foo": "bar"})).unwrap_err();
        assert!(reason(err).starts_with("not a GeoJSON geometry"));
    }
}
