use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use georoi_core::Settings;
use georoi_geo::ReferenceLayer;
use georoi_imagery::{init_session, EarthEngineClient, InitOptions};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use georoi_api::{create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "georoi_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env();
    let settings = Settings::load().context("Failed to load settings")?;
    settings.prepare_dirs().context("Failed to create storage directories")?;

    tracing::info!(
        port = config.port,
        project = %settings.ee_project,
        roi_dir = %settings.roi_dir.display(),
        rdtr_path = %settings.rdtr_path.display(),
        "Starting georoi API server"
    );

    // The listener is only bound once the imagery session is usable
    let session = init_session(&settings, InitOptions::default()).await?;
    let backend = Arc::new(EarthEngineClient::new(Arc::new(session)));

    let reference = Arc::new(ReferenceLayer::new(&settings.rdtr_path));
    let state = Arc::new(AppState::new(settings, reference, backend));

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid GEOROI_CORS_ORIGIN: {}", origin))?,
            )
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = create_router(state).layer(cors);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    match &config.cors_origin {
        Some(origin) => tracing::info!("CORS enabled for {}", origin),
        None => tracing::info!("CORS enabled for any origin"),
    }

    axum::serve(listener, app).await?;
    Ok(())
}
