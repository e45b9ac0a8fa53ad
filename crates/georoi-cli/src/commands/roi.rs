use crate::cli::{BboxArgs, RoiArgs, RoiCommand};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use georoi_core::models::BBox;
use georoi_core::Settings;
use georoi_store::{FileStore, RoiStore};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct RoiRow {
    #[tabled(rename = "ROI")]
    roi_id: String,
    #[tabled(rename = "File")]
    path: String,
}

pub async fn execute(args: RoiArgs, settings: &Settings, output: &OutputWriter) -> Result<()> {
    let store = FileStore::from_settings(settings);

    match args.command {
        RoiCommand::List => list(&store, output).await,
        RoiCommand::Show { roi_id } => show(&store, &roi_id).await,
        RoiCommand::Bbox(bbox) => create_bbox(&store, bbox, output).await,
    }
}

async fn list(store: &FileStore, output: &OutputWriter) -> Result<()> {
    let rows: Vec<RoiRow> = store
        .list_rois()
        .await?
        .into_iter()
        .map(|roi_id| RoiRow {
            path: store.roi_path(&roi_id).display().to_string(),
            roi_id,
        })
        .collect();

    if output.is_json() {
        return output.result(rows);
    }

    output.section(format!("ROIs in {}", store.roi_dir().display()));
    output.table(rows);
    Ok(())
}

async fn show(store: &FileStore, roi_id: &str) -> Result<()> {
    let bytes = store.read_roi(roi_id).await?;
    let text = String::from_utf8(bytes).context("Stored ROI is not UTF-8")?;
    println!("{}", text);
    Ok(())
}

async fn create_bbox(store: &FileStore, args: BboxArgs, output: &OutputWriter) -> Result<()> {
    let bbox = BBox::new(args.min_lon, args.min_lat, args.max_lon, args.max_lat);
    bbox.validate()?;

    let record = store.create_roi(&bbox.to_geometry(), args.name.as_deref()).await?;

    if output.is_json() {
        return output.result(serde_json::json!({
            "roi_id": record.roi_id,
            "name": record.name,
            "path": record.path,
        }));
    }

    output.success(format!("Created ROI {}", record.roi_id));
    output.kv("File", record.path.display());
    Ok(())
}
