//! ROI / reference overlay
//!
//! Every reference feature is intersected with every ROI feature. Areal
//! overlaps keep their polygons; features that only touch the ROI are kept as
//! the shared boundary (lines) or contact points, with zero area.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{
    Area, BooleanOps, BoundingRect, Coord, Geometry, Intersects, Line, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Point,
};
use geojson::{Feature, FeatureCollection, GeoJson};
use georoi_core::error::{GeoroiError, Result};
use georoi_core::models::{Crs, SQUARE_METERS_PER_HECTARE};
use serde_json::{json, Map, Value};

use crate::reference::{ReferenceDataset, ReferenceFeature};
use crate::transform::Reprojector;

/// One row of the overlay output
#[derive(Debug, Clone)]
pub struct OverlayFeature {
    /// Reference attributes of the overlapping feature
    pub properties: Map<String, Value>,
    /// Overlap geometry in WGS 84
    pub geometry: Geometry<f64>,
    pub area_ha: f64,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayResult {
    pub features: Vec<OverlayFeature>,
}

impl OverlayResult {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sum of per-feature areas, unrounded
    pub fn total_area_ha(&self) -> f64 {
        self.features.iter().map(|f| f.area_ha).sum()
    }

    /// GeoJSON output, one feature per overlap with an `area_ha` property
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| {
                let mut properties = f.properties.clone();
                properties.insert("area_ha".to_string(), json!(f.area_ha));
                Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let mut crs = Map::new();
        crs.insert(
            "crs".to_string(),
            json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}}),
        );

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(crs),
        }
    }
}

/// Extract the polygonal geometry of every feature of a stored ROI
pub fn roi_geometries(collection: &FeatureCollection) -> Result<Vec<MultiPolygon<f64>>> {
    collection
        .features
        .iter()
        .filter_map(|feature| feature.geometry.as_ref())
        .map(|geometry| {
            let geom: Geometry<f64> = geometry
                .value
                .clone()
                .try_into()
                .map_err(|e: geojson::Error| GeoroiError::InvalidGeometry {
                    reason: e.to_string(),
                })?;
            match geom {
                Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
                Geometry::MultiPolygon(mp) => Ok(mp),
                _ => Err(GeoroiError::InvalidGeometry {
                    reason: "stored ROI geometry is not polygonal".to_string(),
                }),
            }
        })
        .collect()
}

/// Parse a stored ROI document into its geometries
pub fn roi_geometries_from_geojson(document: &GeoJson) -> Result<Vec<MultiPolygon<f64>>> {
    match document {
        GeoJson::FeatureCollection(fc) => roi_geometries(fc),
        GeoJson::Feature(f) => roi_geometries(&FeatureCollection {
            bbox: None,
            features: vec![f.clone()],
            foreign_members: None,
        }),
        GeoJson::Geometry(g) => roi_geometries(&FeatureCollection {
            bbox: None,
            features: vec![Feature::from(g.clone())],
            foreign_members: None,
        }),
    }
}

/// Dissolve the parts of an ROI into one multipolygon
pub fn roi_union(parts: &[MultiPolygon<f64>]) -> MultiPolygon<f64> {
    let mut iter = parts.iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(Vec::new());
    };
    iter.fold(first.clone(), |acc, part| acc.union(part))
}

/// Intersect an ROI (WGS 84) with the reference dataset and measure each
/// overlap in `metric_crs`.
pub fn intersect_roi(
    reference: &ReferenceDataset,
    roi: &[MultiPolygon<f64>],
    metric_crs: &Crs,
) -> Result<OverlayResult> {
    let to_metric = Reprojector::new(&Crs::wgs84(), metric_crs)?;
    let mut features = Vec::new();

    for feature in &reference.features {
        for roi_geometry in roi {
            let Some(geometry) = overlap(feature, roi_geometry) else {
                continue;
            };

            let area_ha = match &geometry {
                Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
                    to_metric.apply(&geometry)?.unsigned_area() / SQUARE_METERS_PER_HECTARE
                }
                _ => 0.0,
            };

            features.push(OverlayFeature {
                properties: feature.properties.clone(),
                geometry,
                area_ha,
            });
        }
    }

    tracing::debug!(
        reference_features = reference.len(),
        roi_parts = roi.len(),
        overlaps = features.len(),
        "Computed overlay"
    );

    Ok(OverlayResult { features })
}

fn overlap(feature: &ReferenceFeature, roi: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    // Disjoint envelopes cannot produce any contact, not even a point
    match (feature.geometry.bounding_rect(), roi.bounding_rect()) {
        (Some(a), Some(b)) if a.intersects(&b) => {}
        _ => return None,
    }

    let areal = feature.geometry.intersection(roi);
    if !areal.0.is_empty() && areal.unsigned_area() > 0.0 {
        return Some(simplify_multi(areal));
    }

    if !feature.geometry.intersects(roi) {
        return None;
    }

    let boundary = boundary_lines(&feature.geometry);
    let shared = roi.clip(&boundary, false);
    let shared: Vec<LineString<f64>> = shared
        .0
        .into_iter()
        .filter(|ls| ls.0.windows(2).any(|w| w[0] != w[1]))
        .collect();
    if !shared.is_empty() {
        return Some(if shared.len() == 1 {
            Geometry::LineString(shared.into_iter().next()?)
        } else {
            Geometry::MultiLineString(MultiLineString::new(shared))
        });
    }

    let points = contact_points(&boundary, &boundary_lines(roi));
    match points.len() {
        0 => None,
        1 => Some(Geometry::Point(points[0])),
        _ => Some(Geometry::MultiPoint(MultiPoint::new(points))),
    }
}

fn simplify_multi(mut mp: MultiPolygon<f64>) -> Geometry<f64> {
    if mp.0.len() == 1 {
        if let Some(polygon) = mp.0.pop() {
            return Geometry::Polygon(polygon);
        }
    }
    Geometry::MultiPolygon(mp)
}

fn boundary_lines(mp: &MultiPolygon<f64>) -> MultiLineString<f64> {
    MultiLineString::new(
        mp.iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .cloned()
            .collect(),
    )
}

fn segments(lines: &MultiLineString<f64>) -> Vec<Line<f64>> {
    lines.iter().flat_map(|ls| ls.lines()).collect()
}

fn contact_points(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> Vec<Point<f64>> {
    let b_segments = segments(b);
    let mut found: Vec<Coord<f64>> = Vec::new();

    for sa in segments(a) {
        for sb in &b_segments {
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(sa, *sb)
            {
                if !found.contains(&intersection) {
                    found.push(intersection);
                }
            }
        }
    }

    found.into_iter().map(Point::from).collect()
}
