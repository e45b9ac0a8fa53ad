//! georoi store - flat-file persistence for ROIs and overlay results

pub mod file;
pub mod ports;

pub use file::FileStore;
pub use ports::{IntersectionStore, RoiStore};
