use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use geo::{polygon, MultiPolygon};
use georoi_api::{create_router, AppState};
use georoi_core::error::Result;
use georoi_core::Settings;
use georoi_geo::{ReferenceDataset, ReferenceFeature, ReferenceLayer};
use georoi_imagery::{Expression, ImageryBackend, MapHandle, MapRequest};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Imagery backend answering from fixed values and counting every call
struct StubBackend {
    calls: AtomicUsize,
    collection_size: u64,
    area_m2: f64,
    computed: Mutex<Vec<Expression>>,
}

impl StubBackend {
    fn new(collection_size: u64, area_m2: f64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            collection_size,
            area_m2,
            computed: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageryBackend for StubBackend {
    async fn compute_value(&self, expression: &Expression) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.computed.lock().unwrap().push(expression.clone());
        match expression.root().function_name() {
            Some("Collection.size") => Ok(json!(self.collection_size)),
            _ => Ok(json!(self.area_m2)),
        }
    }

    async fn create_map(&self, _request: &MapRequest) -> Result<MapHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(MapHandle {
            name: "projects/test/maps/m1".to_string(),
            tile_url: "https://earthengine.googleapis.com/v1/projects/test/maps/m1/tiles/{z}/{x}/{y}"
                .to_string(),
        })
    }
}

/// Conservation zone covering the eastern half of the example bbox
fn overlapping_zone() -> ReferenceFeature {
    let mut properties = Map::new();
    properties.insert("NAMOBJ".to_string(), json!("Zona Inti"));
    ReferenceFeature {
        properties,
        geometry: MultiPolygon::new(vec![polygon![
            (x: 106.1, y: -6.5),
            (x: 106.3, y: -6.5),
            (x: 106.3, y: -6.3),
            (x: 106.1, y: -6.3),
            (x: 106.1, y: -6.5),
        ]]),
    }
}

fn distant_zone() -> ReferenceFeature {
    let mut properties = Map::new();
    properties.insert("NAMOBJ".to_string(), json!("Far Away"));
    ReferenceFeature {
        properties,
        geometry: MultiPolygon::new(vec![polygon![
            (x: 120.0, y: -2.0),
            (x: 120.5, y: -2.0),
            (x: 120.5, y: -1.5),
            (x: 120.0, y: -1.5),
            (x: 120.0, y: -2.0),
        ]]),
    }
}

struct TestApp {
    _dir: TempDir,
    settings: Settings,
    router: Router,
    backend: Arc<StubBackend>,
}

impl TestApp {
    fn new(zones: Vec<ReferenceFeature>, backend: Arc<StubBackend>) -> Self {
        let dir = TempDir::new().unwrap();
        let settings = Settings::rooted_at(dir.path());
        settings.prepare_dirs().unwrap();

        let reference =
            Arc::new(ReferenceLayer::preloaded(ReferenceDataset::from_features("zones", zones)));
        let state = AppState::new(settings.clone(), reference, backend.clone());

        Self {
            _dir: dir,
            settings,
            router: create_router(Arc::new(state)),
            backend,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) =
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn create_example_roi(&self) -> String {
        let (status, body) = self
            .post(
                "/roi/bbox",
                json!({
                    "name": "Bogor",
                    "bbox": {"min_lon": 106.0, "min_lat": -6.5, "max_lon": 106.2, "max_lat": -6.3}
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["roi_id"].as_str().unwrap().to_string()
    }

    fn roi_file_count(&self) -> usize {
        std::fs::read_dir(&self.settings.roi_dir).unwrap().count()
    }
}

#[tokio::test]
async fn test_status() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));
    let (status, body) = app.get("/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_bbox_example_round_trip() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));

    let (status, created) = app
        .post(
            "/roi/bbox",
            json!({
                "name": "Bogor",
                "bbox": {"min_lon": 106.0, "min_lat": -6.5, "max_lon": 106.2, "max_lat": -6.3}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Bogor");
    let roi_id = created["roi_id"].as_str().unwrap();
    assert!(created["path"].as_str().unwrap().ends_with(&format!("{}.geojson", roi_id)));

    let (status, stored) = app.get(&format!("/roi/{}", roi_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["type"], "FeatureCollection");
    assert_eq!(stored["features"][0]["properties"]["name"], "Bogor");
    assert_eq!(
        stored["features"][0]["geometry"]["coordinates"],
        json!([[[106.0, -6.5], [106.2, -6.5], [106.2, -6.3], [106.0, -6.3], [106.0, -6.5]]])
    );
}

#[tokio::test]
async fn test_degenerate_bbox_rejected() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));

    let (status, body) = app
        .post(
            "/roi/bbox",
            json!({"bbox": {"min_lon": 106.2, "min_lat": -6.5, "max_lon": 106.0, "max_lat": -6.3}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(app.roi_file_count(), 0);
}

#[tokio::test]
async fn test_invalid_geometry_writes_nothing() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));

    let (status, body) = app
        .post("/roi/geojson", json!({"geojson": {"type": "Point", "coordinates": [106.0, -6.5]}}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid GeoJSON");
    assert!(body["details"].as_str().unwrap().contains("Point"));

    let (status, _) = app
        .post("/roi/geojson", json!({"geojson": {"type": "Polygon", "coordinates": []}}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.roi_file_count(), 0);
}

#[tokio::test]
async fn test_geojson_roi_name_defaults_to_id() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));

    let (status, created) = app
        .post(
            "/roi/geojson",
            json!({"geojson": {
                "type": "MultiPolygon",
                "coordinates": [[[[106.0, -6.5], [106.1, -6.5], [106.1, -6.4], [106.0, -6.5]]]]
            }}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["name"].is_null());

    let roi_id = created["roi_id"].as_str().unwrap();
    let (_, stored) = app.get(&format!("/roi/{}", roi_id)).await;
    assert_eq!(stored["features"][0]["properties"]["name"], roi_id);
    assert_eq!(stored["features"][0]["geometry"]["type"], "MultiPolygon");
}

#[tokio::test]
async fn test_list_rois_sorted_with_download_links() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));
    let mut ids = vec![app.create_example_roi().await, app.create_example_roi().await];
    ids.sort();

    let (status, body) = app.get("/roi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["items"][0]["roi_id"], ids[0].as_str());
    assert_eq!(body["items"][1]["download"], format!("/roi/{}/download", ids[1]));
}

#[tokio::test]
async fn test_download_roi_is_attachment() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));
    let roi_id = app.create_example_roi().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/roi/{}/download", roi_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/geo+json");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&format!("{}.geojson", roi_id)));
}

#[tokio::test]
async fn test_unknown_roi_is_404_without_remote_calls() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));
    let missing = "00000000-0000-4000-8000-000000000000";

    let (status, body) = app.get(&format!("/roi/{}", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ROI not found");

    let (status, _) = app.get(&format!("/roi/{}/download", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post(&format!("/roi/{}/analyze", missing), json!({"year": 2020})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Out-of-range year still reports the missing ROI first
    let (status, _) = app.post(&format!("/roi/{}/analyze", missing), json!({"year": 1990})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/roi/{}/index?year=2020", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post(&format!("/roi/{}/intersection", missing), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/roi/not.a.valid.id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_year_out_of_range_is_422() {
    let app = TestApp::new(vec![], StubBackend::new(1, 0.0));
    let roi_id = app.create_example_roi().await;

    let (status, body) = app.post(&format!("/roi/{}/analyze", roi_id), json!({"year": 2014})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().contains("year"));

    let (status, _) = app.post(&format!("/roi/{}/analyze", roi_id), json!({"year": 2036})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_analyze_combines_imagery_and_overlay() {
    // 123 456.78 m² = 12.345678 ha
    let app = TestApp::new(vec![overlapping_zone()], StubBackend::new(5, 123_456.78));
    let roi_id = app.create_example_roi().await;

    let (status, body) = app
        .post(&format!("/roi/{}/analyze", roi_id), json!({"year": 2020, "index": "ndbi"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2020);
    assert_eq!(body["index"], "ndbi");
    assert_eq!(body["area_water_ha"], 12.35);
    assert_eq!(body["area_land_ha"], 12.35);

    // Half of the box, about 11 km x 22 km
    let conservation = body["area_land_in_conservation_ha"].as_f64().unwrap();
    assert!(conservation > 20_000.0 && conservation < 30_000.0, "got {}", conservation);

    assert_eq!(app.backend.calls(), 2);
}

#[tokio::test]
async fn test_analyze_2015_runs_fallback_query() {
    let app = TestApp::new(vec![], StubBackend::new(0, 0.0));
    let roi_id = app.create_example_roi().await;

    let (status, body) = app.post(&format!("/roi/{}/analyze", roi_id), json!({"year": 2015})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["area_land_in_conservation_ha"], 0.0);

    let computed = app.backend.computed.lock().unwrap();
    assert_eq!(computed[0].root().function_name(), Some("Collection.size"));
    assert!(computed[1..]
        .iter()
        .all(|e| e.to_json().to_string().contains("2015-07-01")));
}

#[tokio::test]
async fn test_index_preview() {
    let app = TestApp::new(vec![], StubBackend::new(5, 0.0));
    let roi_id = app.create_example_roi().await;

    let (status, body) = app.get(&format!("/roi/{}/index?year=2021&index=NDBI", roi_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2021);
    assert_eq!(body["index"], "ndbi");
    assert_eq!(body["mapid"], "projects/test/maps/m1");
    assert!(body["tile_url"].as_str().unwrap().contains("{z}/{x}/{y}"));

    let (_, body) = app.get(&format!("/roi/{}/index?year=2021&index=evi", roi_id)).await;
    assert_eq!(body["index"], "ndwi");
}

#[tokio::test]
async fn test_intersection_with_overlap() {
    let app = TestApp::new(vec![overlapping_zone(), distant_zone()], StubBackend::new(1, 0.0));
    let roi_id = app.create_example_roi().await;

    let (status, body) = app.post(&format!("/roi/{}/intersection", roi_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roi_id"], roi_id.as_str());
    assert_eq!(body["rdtr_features"], 1);
    assert!(body["total_area_ha"].as_f64().unwrap() > 20_000.0);

    let (status, stored) = app.get(&format!("/intersection/{}/download", roi_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["features"][0]["properties"]["NAMOBJ"], "Zona Inti");
    assert!(stored["features"][0]["properties"]["area_ha"].as_f64().unwrap() > 0.0);

    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_zero_overlap_still_writes_output() {
    let app = TestApp::new(vec![distant_zone()], StubBackend::new(1, 0.0));
    let roi_id = app.create_example_roi().await;

    let (status, _) = app.get(&format!("/intersection/{}/download", roi_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.post(&format!("/roi/{}/intersection", roi_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rdtr_features"], 0);
    assert_eq!(body["total_area_ha"], 0.0);

    let output = body["output_path"].as_str().unwrap();
    assert!(output.ends_with(&format!("{}_rdtr.geojson", roi_id)));
    assert!(std::path::Path::new(output).exists());

    let (status, stored) = app.get(&format!("/intersection/{}/download", roi_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["features"], json!([]));
}
