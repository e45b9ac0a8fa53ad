//! georoi core - domain models, settings, and the shared error type
//!
//! Every other crate in the workspace builds on the types defined here.

pub mod config;
pub mod error;
pub mod models;

pub use config::Settings;
pub use error::{GeoroiError, Result};
