use georoi_core::Settings;
use georoi_geo::ReferenceLayer;
use georoi_imagery::{ImageryBackend, IndexEngine};
use georoi_store::{FileStore, IntersectionStore, RoiStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub roi_store: Arc<dyn RoiStore>,
    pub intersection_store: Arc<dyn IntersectionStore>,
    pub reference: Arc<ReferenceLayer>,
    pub imagery: Arc<IndexEngine>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        reference: Arc<ReferenceLayer>,
        backend: Arc<dyn ImageryBackend>,
    ) -> Self {
        let store = Arc::new(FileStore::from_settings(&settings));
        Self {
            settings: Arc::new(settings),
            roi_store: store.clone(),
            intersection_store: store,
            reference,
            imagery: Arc::new(IndexEngine::new(backend)),
        }
    }
}
