use async_trait::async_trait;
use georoi_core::error::{GeoroiError, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::Session;
use crate::expression::Expression;
use crate::ports::{ImageryBackend, MapHandle, MapRequest};

pub const DEFAULT_BASE_URL: &str = "https://earthengine.googleapis.com";
const API_VERSION: &str = "v1";

/// Earth Engine REST client
pub struct EarthEngineClient {
    /// Base URL for the REST API (e.g., "https://earthengine.googleapis.com")
    base_url: String,

    session: Arc<Session>,

    client: reqwest::Client,
}

impl EarthEngineClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, session)
    }

    pub fn with_base_url(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            base_url: base_url.into(),
            session,
            client: reqwest::Client::new(),
        }
    }

    pub fn project(&self) -> &str {
        self.session.project()
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/{}/projects/{}/{}", self.base_url, API_VERSION, self.session.project(), method)
    }

    /// Tile template for a map resource name
    pub fn tile_url(&self, map_name: &str) -> String {
        format!("{}/{}/{}/tiles/{{z}}/{{x}}/{{y}}", self.base_url, API_VERSION, map_name)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.session.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("x-goog-user-project", self.session.project())
            .json(body)
            .send()
            .await
            .map_err(|e| GeoroiError::Remote(format!("Failed to connect to Earth Engine: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeoroiError::Remote(format!(
                "Earth Engine API error ({}): {}",
                status,
                error_message(&error_text)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| {
                GeoroiError::Remote(format!("Failed to parse Earth Engine response: {}", e))
            })
    }
}

/// Pull `error.message` out of a Google API error body
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl ImageryBackend for EarthEngineClient {
    async fn compute_value(&self, expression: &Expression) -> Result<Value> {
        let body = json!({ "expression": expression.to_json() });
        let mut response = self.post(&self.project_url("value:compute"), &body).await?;

        tracing::debug!(function = ?expression.root().function_name(), "Computed value");

        Ok(response.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    async fn create_map(&self, request: &MapRequest) -> Result<MapHandle> {
        let vis = &request.visualization;
        let body = json!({
            "expression": request.expression.to_json(),
            "fileFormat": "AUTO_JPEG_PNG",
            "visualizationOptions": {
                "ranges": [{ "min": vis.min, "max": vis.max }],
                "paletteColors": vis.palette,
            },
        });

        let response = self.post(&self.project_url("maps"), &body).await?;
        let name = response
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GeoroiError::Remote("map response has no name".to_string()))?
            .to_string();

        tracing::debug!(map = %name, "Created map");

        Ok(MapHandle {
            tile_url: self.tile_url(&name),
            name,
        })
    }
}
