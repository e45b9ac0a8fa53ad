//! Imagery platform port definitions

use async_trait::async_trait;
use georoi_core::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::Expression;

/// Port for the remote imagery platform
#[async_trait]
pub trait ImageryBackend: Send + Sync {
    /// Evaluate an expression and return its computed value
    async fn compute_value(&self, expression: &Expression) -> Result<Value>;

    /// Register a visualised image and return a tile endpoint for it
    async fn create_map(&self, request: &MapRequest) -> Result<MapHandle>;
}

/// Single-band colour ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub min: f64,
    pub max: f64,
    /// Hex colours without the leading `#`
    pub palette: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MapRequest {
    pub expression: Expression,
    pub visualization: Visualization,
}

/// A registered map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapHandle {
    /// Resource name, `projects/{project}/maps/{id}`
    pub name: String,
    /// XYZ template with `{z}`, `{x}`, `{y}` placeholders
    pub tile_url: String,
}
