//! georoi imagery - Earth Engine session, REST client and Sentinel-2 indices

pub mod auth;
pub mod client;
pub mod engine;
pub mod expression;
pub mod ports;

pub use auth::{init_session, Credentials, InitOptions, Session};
pub use client::EarthEngineClient;
pub use engine::{IndexEngine, IndexPreview};
pub use expression::{Expr, Expression};
pub use ports::{ImageryBackend, MapHandle, MapRequest, Visualization};
