//! Reference (conservation zone) dataset loader
//!
//! The dataset is an ESRI Shapefile (`.shp`, `.shx`, `.dbf` and an optional
//! `.prj`). It is read once, reprojected to WGS 84 and then shared read-only.

use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use georoi_core::error::{GeoroiError, Result};
use georoi_core::models::Crs;
use serde_json::{Map, Value};
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{PolygonRing, Shape};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::transform::Reprojector;

/// One reference polygon with its attribute table row
#[derive(Debug, Clone)]
pub struct ReferenceFeature {
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

/// The reference layer held in memory, always in WGS 84
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    pub name: String,
    /// CRS declared by the source before reprojection
    pub source_crs: Crs,
    pub features: Vec<ReferenceFeature>,
}

impl ReferenceDataset {
    /// Build a dataset from features already in WGS 84
    pub fn from_features(name: impl Into<String>, features: Vec<ReferenceFeature>) -> Self {
        Self {
            name: name.into(),
            source_crs: Crs::wgs84(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Read a shapefile and reproject it to WGS 84
    pub fn load(path: &Path) -> Result<Self> {
        verify_components(path)?;

        let mut reader = shapefile::Reader::from_path(path).map_err(|e| GeoroiError::Format {
            format: "Shapefile".to_string(),
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;

        let source_crs = extract_crs(path)?;
        let reprojector = Reprojector::new(&source_crs, &Crs::wgs84())?;

        let mut features = Vec::new();
        let mut skipped = 0usize;

        for (index, item) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = item.map_err(|e| GeoroiError::Format {
                format: "Shapefile".to_string(),
                message: format!("Failed to read feature {}: {}", index, e),
            })?;

            let Some(geometry) = shape_to_multipolygon(&shape) else {
                skipped += 1;
                continue;
            };

            let Geometry::MultiPolygon(geometry) =
                reprojector.apply(&Geometry::MultiPolygon(geometry))?
            else {
                return Err(GeoroiError::Projection(
                    "reprojection changed the geometry type".to_string(),
                ));
            };

            let properties = record
                .into_iter()
                .map(|(name, value)| (name, convert_dbase_value(&value)))
                .collect();

            features.push(ReferenceFeature {
                properties,
                geometry,
            });
        }

        if skipped > 0 {
            tracing::warn!(skipped, path = %path.display(), "Skipped non-polygon shapes");
        }

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("reference").to_string();

        tracing::info!(
            name = %name,
            features = features.len(),
            source_crs = %source_crs.name,
            "Loaded reference dataset"
        );

        Ok(Self {
            name,
            source_crs,
            features,
        })
    }
}

/// Shared handle that loads the dataset on first use.
///
/// Concurrent first callers wait for the same load; afterwards every caller
/// gets the cached `Arc`. There is no reload.
#[derive(Debug)]
pub struct ReferenceLayer {
    path: PathBuf,
    cell: OnceCell<Arc<ReferenceDataset>>,
}

impl ReferenceLayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// A layer that never touches the filesystem
    pub fn preloaded(dataset: ReferenceDataset) -> Self {
        Self {
            path: PathBuf::new(),
            cell: OnceCell::new_with(Some(Arc::new(dataset))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Get the dataset, loading it on a blocking thread the first time
    pub async fn get(&self) -> Result<Arc<ReferenceDataset>> {
        let dataset = self
            .cell
            .get_or_try_init(|| async {
                let path = self.path.clone();
                tokio::task::spawn_blocking(move || ReferenceDataset::load(&path))
                    .await
                    .map_err(|e| GeoroiError::Io(std::io::Error::other(e)))?
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(dataset))
    }
}

/// Verify that the required Shapefile component files exist
fn verify_components(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(GeoroiError::ReferenceMissing {
            path: path.to_path_buf(),
        });
    }

    let missing: Vec<String> = ["shx", "dbf"]
        .iter()
        .filter(|ext| !path.with_extension(ext).exists())
        .map(|ext| format!(".{}", ext))
        .collect();

    if !missing.is_empty() {
        return Err(GeoroiError::Format {
            format: "Shapefile".to_string(),
            message: format!("Missing required component files: {}", missing.join(", ")),
        });
    }

    Ok(())
}

/// Extract the CRS from the `.prj` file, assuming WGS 84 only when the file is absent.
///
/// WKT without a recognisable EPSG code is handed to PROJ as is.
fn extract_crs(path: &Path) -> Result<Crs> {
    let prj_path = path.with_extension("prj");

    if !prj_path.exists() {
        tracing::warn!(path = %path.display(), "No .prj file, assuming EPSG:4326");
        return Ok(Crs::wgs84());
    }

    let prj_content = fs::read_to_string(&prj_path).map_err(|e| GeoroiError::Format {
        format: "Shapefile".to_string(),
        message: format!("Failed to read .prj file: {}", e),
    })?;

    if let Some(epsg) = parse_epsg_from_wkt(&prj_content) {
        return Ok(Crs::from_epsg(epsg));
    }

    if prj_content.trim().is_empty() {
        return Err(GeoroiError::Format {
            format: "Shapefile".to_string(),
            message: format!("{} is empty", prj_path.display()),
        });
    }

    let crs = Crs::from_wkt(prj_content);
    tracing::debug!(
        path = %prj_path.display(),
        name = %crs.name,
        "No EPSG code in .prj, using WKT"
    );
    Ok(crs)
}

/// Find an EPSG code in WKT, covering both OGC and ESRI flavours
fn parse_epsg_from_wkt(wkt: &str) -> Option<u32> {
    // The outermost AUTHORITY closes the definition, so the last one wins
    if let Some(start) = wkt.rfind("AUTHORITY[\"EPSG\",") {
        let digits: String = wkt[start + 17..]
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse::<u32>() {
            return Some(code);
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let digits: String =
            wkt[start + 5..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = digits.parse::<u32>() {
            return Some(code);
        }
    }

    // ESRI .prj files carry names instead of codes
    if wkt.contains("WGS_1984_UTM_Zone_") {
        let start = wkt.find("WGS_1984_UTM_Zone_")? + 18;
        let zone: String = wkt[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
        let zone: u32 = zone.parse().ok()?;
        let hemisphere = wkt[start..].chars().find(|c| c.is_ascii_alphabetic())?;
        return match hemisphere {
            'N' => Some(32600 + zone),
            'S' => Some(32700 + zone),
            _ => None,
        };
    }

    if wkt.trim_start().starts_with("GEOGCS") && wkt.contains("WGS_1984") {
        return Some(4326);
    }

    None
}

fn ring_coords(points: impl IntoIterator<Item = (f64, f64)>) -> LineString<f64> {
    points.into_iter().map(|(x, y)| Coord { x, y }).collect()
}

/// Group shapefile rings into polygons: each outer ring starts a polygon and
/// following inner rings are its holes.
fn assemble(rings: Vec<(bool, LineString<f64>)>) -> MultiPolygon<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for (outer, ring) in rings {
        match polygons.last_mut() {
            Some((_, holes)) if !outer => holes.push(ring),
            _ => polygons.push((ring, Vec::new())),
        }
    }
    MultiPolygon::new(
        polygons.into_iter().map(|(exterior, holes)| Polygon::new(exterior, holes)).collect(),
    )
}

fn shape_to_multipolygon(shape: &Shape) -> Option<MultiPolygon<f64>> {
    let rings: Vec<(bool, LineString<f64>)> = match shape {
        Shape::Polygon(polygon) => polygon
            .rings()
            .iter()
            .map(|ring| {
                let outer = matches!(ring, PolygonRing::Outer(_));
                (outer, ring_coords(ring.points().iter().map(|p| (p.x, p.y))))
            })
            .collect(),
        Shape::PolygonM(polygon) => polygon
            .rings()
            .iter()
            .map(|ring| {
                let outer = matches!(ring, PolygonRing::Outer(_));
                (outer, ring_coords(ring.points().iter().map(|p| (p.x, p.y))))
            })
            .collect(),
        Shape::PolygonZ(polygon) => polygon
            .rings()
            .iter()
            .map(|ring| {
                let outer = matches!(ring, PolygonRing::Outer(_));
                (outer, ring_coords(ring.points().iter().map(|p| (p.x, p.y))))
            })
            .collect(),
        _ => return None,
    };

    if rings.is_empty() {
        return None;
    }
    Some(assemble(rings))
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> Value {
    let number = |n: f64| serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);

    match value {
        DbaseFieldValue::Character(Some(s)) => Value::String(s.trim_end().to_string()),
        DbaseFieldValue::Numeric(Some(n)) => number(*n),
        DbaseFieldValue::Float(Some(f)) => number(*f as f64),
        DbaseFieldValue::Double(d) => number(*d),
        DbaseFieldValue::Currency(c) => number(*c),
        DbaseFieldValue::Integer(i) => Value::Number((*i).into()),
        DbaseFieldValue::Logical(Some(b)) => Value::Bool(*b),
        DbaseFieldValue::Date(Some(date)) => {
            Value::String(format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()))
        }
        DbaseFieldValue::Memo(s) => Value::String(s.clone()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epsg_from_wkt() {
        let ogc = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(parse_epsg_from_wkt(ogc), Some(4326));

        assert_eq!(parse_epsg_from_wkt("EPSG:3857"), Some(3857));

        let esri_utm = r#"PROJCS["WGS_1984_UTM_Zone_49S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]]]"#;
        assert_eq!(parse_epsg_from_wkt(esri_utm), Some(32749));

        let esri_geo = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(parse_epsg_from_wkt(esri_geo), Some(4326));

        assert_eq!(parse_epsg_from_wkt("LOCAL_CS[\"unknown\"]"), None);
    }

    #[test]
    fn test_assemble_holes_follow_outer_ring() {
        let square = |o: f64, s: f64| -> LineString<f64> {
            ring_coords(vec![(o, o), (o, o + s), (o + s, o + s), (o + s, o), (o, o)])
        };
        let mp = assemble(vec![
            (true, square(0.0, 10.0)),
            (false, square(2.0, 1.0)),
            (true, square(20.0, 5.0)),
        ]);
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!(mp.0[1].interiors().is_empty());
    }

    #[test]
    fn test_unrecognised_prj_keeps_its_wkt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.shp");
        let wkt = r#"PROJCS["DGN_1995_TM_3_Zone_49.1",UNIT["Meter",1.0]]"#;
        fs::write(path.with_extension("prj"), wkt).unwrap();

        assert_eq!(parse_epsg_from_wkt(wkt), None);
        let crs = extract_crs(&path).unwrap();
        assert_ne!(crs, Crs::wgs84());
        assert_eq!(crs.name, "DGN_1995_TM_3_Zone_49.1");
        assert_eq!(crs.definition(), wkt);
    }

    #[test]
    fn test_empty_prj_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.shp");
        fs::write(path.with_extension("prj"), "  \n").unwrap();

        let err = extract_crs(&path).unwrap_err();
        assert!(matches!(err, GeoroiError::Format { .. }));
    }

    #[test]
    fn test_missing_dataset() {
        let err = ReferenceDataset::load(Path::new("/nonexistent/zones.shp")).unwrap_err();
        assert!(matches!(err, GeoroiError::ReferenceMissing { .. }));
    }

    #[tokio::test]
    async fn test_preloaded_layer_skips_filesystem() {
        let layer = ReferenceLayer::preloaded(ReferenceDataset::from_features("empty", vec![]));
        assert!(layer.is_loaded());
        let dataset = layer.get().await.unwrap();
        assert!(dataset.is_empty());
    }

    #[tokio::test]
    async fn test_lazy_layer_reports_missing_file() {
        let layer = ReferenceLayer::new("/nonexistent/zones.shp");
        assert!(!layer.is_loaded());
        assert!(layer.get().await.is_err());
        assert!(!layer.is_loaded());
    }
}
