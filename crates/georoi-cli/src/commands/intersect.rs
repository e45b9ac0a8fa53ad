use crate::cli::IntersectArgs;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geojson::GeoJson;
use georoi_core::models::{round_ha, Crs};
use georoi_core::Settings;
use georoi_geo::{intersect_roi, roi_geometries_from_geojson, ReferenceDataset};
use georoi_store::{FileStore, IntersectionStore, RoiStore};

/// Run the conservation overlay for one stored ROI without the server
pub async fn execute(
    args: IntersectArgs,
    settings: &Settings,
    output: &OutputWriter,
) -> Result<()> {
    let store = FileStore::from_settings(settings);

    let bytes = store.read_roi(&args.roi_id).await?;
    let document: GeoJson = serde_json::from_slice(&bytes)
        .with_context(|| format!("Stored ROI {} is not valid GeoJSON", args.roi_id))?;
    let parts = roi_geometries_from_geojson(&document)?;

    let rdtr_path = settings.rdtr_path.clone();
    let metric_crs = Crs::from_epsg(settings.default_utm_epsg);
    let result = tokio::task::spawn_blocking(move || {
        let reference = ReferenceDataset::load(&rdtr_path)?;
        intersect_roi(&reference, &parts, &metric_crs)
    })
    .await??;

    let path = store.save_intersection(&args.roi_id, &result.to_feature_collection()).await?;
    let total_ha = round_ha(result.total_area_ha());

    if output.is_json() {
        return output.result(serde_json::json!({
            "roi_id": args.roi_id,
            "features": result.len(),
            "conservation_area_ha": total_ha,
            "path": path,
        }));
    }

    if result.is_empty() {
        output.warning("ROI does not overlap any conservation area");
    }
    output.success(format!("Wrote {} overlapping feature(s)", result.len()));
    output.kv("Conservation area", format!("{} ha", total_ha));
    output.kv("File", path.display());
    Ok(())
}
