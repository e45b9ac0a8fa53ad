//! Integration tests for the georoi binary
//!
//! Each test points the storage settings at its own temp directory.

use serde_json::Value;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn georoi(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_georoi"))
        .args(args)
        .args(["--env-file", root.join("missing.env").to_str().unwrap()])
        .current_dir(root)
        .env("STORAGE_DIR", root.join("data"))
        .env("ROI_DIR", root.join("data/rois"))
        .env("INTERSECT_DIR", root.join("data/intersections"))
        .env("RDTR_PATH", root.join("zones.shp"))
        .env("EE_PROJECT", "test-project")
        .env_remove("EE_KEY_FILE")
        .env_remove("EE_SERVICE_ACCOUNT")
        .env_remove("DEFAULT_UTM_EPSG")
        .output()
        .expect("Failed to execute command")
}

fn json_data(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: Value = serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(parsed["status"], "success");
    parsed["data"].clone()
}

fn write_zone(root: &Path, min_x: f64, min_y: f64, size: f64) -> PathBuf {
    let path = root.join("zones.shp");
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("NAMOBJ").unwrap(), 50);
    let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

    let ring = vec![
        Point::new(min_x, min_y),
        Point::new(min_x, min_y + size),
        Point::new(min_x + size, min_y + size),
        Point::new(min_x + size, min_y),
        Point::new(min_x, min_y),
    ];
    let mut record = Record::default();
    record.insert("NAMOBJ".to_string(), FieldValue::Character(Some("Cagar Alam".to_string())));
    writer
        .write_shape_and_record(&Polygon::new(PolygonRing::Outer(ring)), &record)
        .unwrap();

    path
}

#[test]
fn test_bbox_then_list_and_show() {
    let dir = TempDir::new().unwrap();

    let output = georoi(
        dir.path(),
        &["roi", "bbox", "106.0", "-6.5", "106.2", "-6.3", "--name", "Pantai", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let created = json_data(&output);
    let roi_id = created["roi_id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Pantai");
    assert!(dir.path().join("data/rois").join(format!("{}.geojson", roi_id)).exists());

    let listed = json_data(&georoi(dir.path(), &["roi", "list", "--json"]));
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["roi_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![roi_id.as_str()]);

    let shown = georoi(dir.path(), &["roi", "show", &roi_id]);
    assert!(shown.status.success());
    let document: Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(document["type"], "FeatureCollection");
    assert_eq!(document["features"][0]["properties"]["name"], "Pantai");
}

#[test]
fn test_degenerate_bbox_fails_without_writing() {
    let dir = TempDir::new().unwrap();

    let output = georoi(dir.path(), &["roi", "bbox", "106.2", "-6.5", "106.0", "-6.3"]);
    assert!(!output.status.success());

    let rois = std::fs::read_dir(dir.path().join("data/rois")).unwrap().count();
    assert_eq!(rois, 0);
}

#[test]
fn test_show_unknown_roi_fails() {
    let dir = TempDir::new().unwrap();

    let output = georoi(dir.path(), &["roi", "show", "does-not-exist"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does-not-exist"));
}

#[test]
fn test_intersect_writes_overlay() {
    let dir = TempDir::new().unwrap();
    write_zone(dir.path(), 106.1, -6.4, 0.2);

    let created = json_data(&georoi(
        dir.path(),
        &["roi", "bbox", "106.0", "-6.5", "106.2", "-6.3", "--json"],
    ));
    let roi_id = created["roi_id"].as_str().unwrap();

    let output = georoi(dir.path(), &["intersect", roi_id, "--json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let data = json_data(&output);
    assert_eq!(data["features"], 1);
    // 0.1 x 0.1 degree near 6.4 S, roughly 12,200 ha
    let area = data["conservation_area_ha"].as_f64().unwrap();
    assert!(area > 11_000.0 && area < 13_500.0, "area was {}", area);

    let written = dir.path().join("data/intersections").join(format!("{}_rdtr.geojson", roi_id));
    let document: Value = serde_json::from_slice(&std::fs::read(written).unwrap()).unwrap();
    assert_eq!(document["features"][0]["properties"]["NAMOBJ"], "Cagar Alam");
}

#[test]
fn test_doctor_reports_missing_reference() {
    let dir = TempDir::new().unwrap();

    let output = georoi(dir.path(), &["doctor", "--json"]);
    assert!(output.status.success());
    let data = json_data(&output);

    let reference = data["checks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|check| check["name"] == "Reference")
        .unwrap();
    assert_eq!(reference["passed"], false);

    let project = data["settings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["key"] == "EE_PROJECT")
        .unwrap();
    assert_eq!(project["value"], "test-project");
    assert_eq!(project["source"], "environment");
}
