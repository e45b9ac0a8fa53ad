//! Sentinel-2 annual composites and spectral index statistics

use geo::{MultiPolygon, Polygon};
use georoi_core::error::{GeoroiError, Result};
use georoi_core::models::{AreaStats, SpectralIndex, SQUARE_METERS_PER_HECTARE};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::expression::{Expr, Expression};
use crate::ports::{ImageryBackend, MapRequest, Visualization};

pub const COLLECTION_ID: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Scene classification values dropped before compositing:
/// cloud shadow, cloud medium/high probability, cirrus, snow
pub const MASKED_SCL_CLASSES: [f64; 5] = [3.0, 8.0, 9.0, 10.0, 11.0];

const ANALYSIS_SCALE_M: f64 = 20.0;
const MAX_PIXELS: f64 = 1e11;
const ANALYSIS_CRS: &str = "EPSG:4326";

// Surface reflectance coverage begins mid-2015
const FALLBACK_YEAR: i32 = 2015;
const FALLBACK_START: &str = "2015-07-01";
const FALLBACK_END: &str = "2015-12-31";

const MAPPED_IMAGE: &str = "_MAPPING_VAR_0_0";

/// Tile layer for an index composite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexPreview {
    pub year: i32,
    pub index: SpectralIndex,
    pub tile_url: String,
    pub mapid: String,
    pub token: String,
}

/// Builds Sentinel-2 expressions for an ROI and evaluates them on the backend
pub struct IndexEngine {
    backend: Arc<dyn ImageryBackend>,
}

impl IndexEngine {
    pub fn new(backend: Arc<dyn ImageryBackend>) -> Self {
        Self { backend }
    }

    /// Water/land split of the ROI from the NDWI of the annual median
    pub async fn area_stats(
        &self,
        roi: &MultiPolygon<f64>,
        year: i32,
        cloud_pct: u32,
    ) -> Result<AreaStats> {
        let region = region_geometry(roi)?;
        let composite = self.annual_median(year, &region, cloud_pct).await?;
        let ndwi = spectral_index(&composite, SpectralIndex::Ndwi);

        let water = Expression::new(masked_area(
            ndwi.clone().gt_value(0.0),
            &region,
            SpectralIndex::Ndwi,
        ));
        let land = Expression::new(masked_area(ndwi.lte_value(0.0), &region, SpectralIndex::Ndwi));

        let (water_m2, land_m2) = tokio::try_join!(
            self.backend.compute_value(&water),
            self.backend.compute_value(&land),
        )?;

        let stats = AreaStats {
            water_ha: as_number(&water_m2) / SQUARE_METERS_PER_HECTARE,
            land_ha: as_number(&land_m2) / SQUARE_METERS_PER_HECTARE,
        };

        tracing::info!(
            year,
            water_ha = stats.water_ha,
            land_ha = stats.land_ha,
            "Computed area statistics"
        );

        Ok(stats)
    }

    /// Register a colour-ramped index layer and return its tile endpoint
    pub async fn preview(
        &self,
        roi: &MultiPolygon<f64>,
        year: i32,
        index: SpectralIndex,
        cloud_pct: u32,
    ) -> Result<IndexPreview> {
        let region = region_geometry(roi)?;
        let composite = self.annual_median(year, &region, cloud_pct).await?;

        let request = MapRequest {
            expression: Expression::new(spectral_index(&composite, index)),
            visualization: visualization(index),
        };
        let map = self.backend.create_map(&request).await?;

        Ok(IndexPreview {
            year,
            index,
            tile_url: map.tile_url,
            mapid: map.name,
            // REST maps are authorized by resource name; there is no separate token
            token: String::new(),
        })
    }

    /// Median of the cloud-masked collection, clipped to the region.
    ///
    /// For 2015 the filtered collection is often empty; then the second half
    /// of 2015 is used without the scene cloud filter.
    async fn annual_median(&self, year: i32, region: &Expr, cloud_pct: u32) -> Result<Expr> {
        let mut collection = masked_collection(year, region, cloud_pct);

        if year == FALLBACK_YEAR {
            let size = Expr::invoke("Collection.size", [("collection", collection.clone())]);
            let size = self.backend.compute_value(&Expression::new(size)).await?;
            if as_number(&size) == 0.0 {
                tracing::info!(year, "Primary collection empty, using fallback date range");
                collection = fallback_collection(region);
            }
        }

        let median = Expr::invoke("reduce.median", [("collection", collection)]);
        Ok(median.clip(region.clone()))
    }
}

fn as_number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Earth Engine geometry for an ROI in WGS 84
pub fn region_geometry(roi: &MultiPolygon<f64>) -> Result<Expr> {
    match roi.0.as_slice() {
        [] => Err(GeoroiError::InvalidGeometry {
            reason: "ROI has no polygons".to_string(),
        }),
        [polygon] => Ok(Expr::invoke(
            "GeometryConstructors.Polygon",
            [("coordinates", Expr::constant(polygon_coordinates(polygon)))],
        )),
        polygons => Ok(Expr::invoke(
            "GeometryConstructors.MultiPolygon",
            [(
                "coordinates",
                Expr::constant(Value::Array(polygons.iter().map(polygon_coordinates).collect())),
            )],
        )),
    }
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Value {
    let ring = |ls: &geo::LineString<f64>| -> Value {
        Value::Array(ls.0.iter().map(|c| json!([c.x, c.y])).collect())
    };
    let mut rings = vec![ring(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring));
    Value::Array(rings)
}

fn date_filter(start: &str, end: &str) -> Expr {
    let range = Expr::invoke(
        "DateRange",
        [("start", Expr::constant(start)), ("end", Expr::constant(end))],
    );
    Expr::invoke(
        "Filter.dateRangeContains",
        [("leftValue", range), ("rightField", Expr::constant("system:time_start"))],
    )
}

fn bounds_filter(region: &Expr) -> Expr {
    Expr::invoke(
        "Filter.intersects",
        [("leftField", Expr::constant(".all")), ("rightValue", region.clone())],
    )
}

fn filtered(collection: Expr, filter: Expr) -> Expr {
    Expr::invoke("Collection.filter", [("collection", collection), ("filter", filter)])
}

fn load_collection() -> Expr {
    Expr::invoke("ImageCollection.load", [("id", Expr::constant(COLLECTION_ID))])
}

/// Mask out unusable pixels using the scene classification band
fn scl_mask(image: Expr) -> Expr {
    let scl = image.clone().select("SCL");
    let bad = MASKED_SCL_CLASSES
        .iter()
        .map(|class| scl.clone().eq_value(*class))
        .reduce(Expr::or);
    match bad {
        Some(bad) => image.update_mask(bad.not()),
        None => image,
    }
}

fn masked_collection(year: i32, region: &Expr, cloud_pct: u32) -> Expr {
    let start = format!("{}-01-01", year);
    let end = format!("{}-12-31", year);

    let collection = filtered(load_collection(), date_filter(&start, &end));
    let collection = filtered(collection, bounds_filter(region));
    let cloud_filter = Expr::invoke(
        "Filter.lessThan",
        [
            ("leftField", Expr::constant("CLOUDY_PIXEL_PERCENTAGE")),
            ("rightValue", Expr::constant(cloud_pct)),
        ],
    );
    let collection = filtered(collection, cloud_filter);

    Expr::invoke(
        "Collection.map",
        [
            ("collection", collection),
            ("baseAlgorithm", Expr::function(MAPPED_IMAGE, scl_mask(Expr::argument(MAPPED_IMAGE)))),
        ],
    )
}

fn fallback_collection(region: &Expr) -> Expr {
    let collection = filtered(load_collection(), date_filter(FALLBACK_START, FALLBACK_END));
    filtered(collection, bounds_filter(region))
}

fn analysis_band(image: &Expr, band: &str) -> Expr {
    image
        .clone()
        .select(band)
        .resample("bilinear")
        .reproject(ANALYSIS_CRS, ANALYSIS_SCALE_M)
}

/// (a - b) / (a + b), named after the index
fn spectral_index(image: &Expr, index: SpectralIndex) -> Expr {
    let (a, b) = match index {
        SpectralIndex::Ndwi => ("B3", "B8"),
        SpectralIndex::Ndbi => ("B11", "B8"),
    };
    let a = analysis_band(image, a);
    let b = analysis_band(image, b);
    a.clone().subtract(b.clone()).divide(a.add(b)).rename(index.as_str())
}

/// Sum of pixel area (m²) where `mask` is set, read back from the result
/// dictionary. A missing value comes back as null.
fn masked_area(mask: Expr, region: &Expr, band: SpectralIndex) -> Expr {
    let area = mask.multiply(Expr::call("Image.pixelArea"));
    let reduced = Expr::invoke(
        "Image.reduceRegion",
        [
            ("image", area),
            ("reducer", Expr::call("Reducer.sum")),
            ("geometry", region.clone()),
            ("scale", Expr::constant(ANALYSIS_SCALE_M)),
            ("maxPixels", Expr::constant(MAX_PIXELS)),
        ],
    );
    Expr::invoke(
        "Dictionary.get",
        [
            ("dictionary", reduced),
            ("key", Expr::constant(band.as_str())),
            ("defaultValue", Expr::null()),
        ],
    )
}

pub fn visualization(index: SpectralIndex) -> Visualization {
    let (min, max, palette) = match index {
        SpectralIndex::Ndwi => (-0.3, 0.7, ["fee5d9", "74c476", "006d2c"]),
        SpectralIndex::Ndbi => (-0.3, 0.3, ["f7fbff", "6baed6", "08306b"]),
    };
    Visualization {
        min,
        max,
        palette: palette.iter().map(|c| c.to_string()).collect(),
    }
}
