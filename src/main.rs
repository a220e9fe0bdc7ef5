//! Filebox server binary.
//!
//! Resolves configuration from the environment once, opens the data directory and serves the
//! REST API (with Swagger UI at `/swagger-ui`).

use anyhow::Context;
use api_rest::{router, AppState};
use filebox_core::{constants::DEFAULT_DATA_DIR, max_upload_bytes_from_env_value, CoreConfig, Filebox};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Filebox service
///
/// # Environment Variables
/// - `FILEBOX_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `FILEBOX_DATA_DIR`: Directory for metadata and blobs (default: "file_data")
/// - `FILEBOX_MAX_UPLOAD_BYTES`: Largest accepted upload (default: 50 MiB)
/// - `API_KEY`: When set, every `/api` request must carry it in `x-api-key`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("filebox_run=info".parse()?)
                .add_directive("filebox_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("FILEBOX_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("FILEBOX_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("FILEBOX_MAX_UPLOAD_BYTES").ok())?;
    let api_key = std::env::var("API_KEY").ok().filter(|key| !key.is_empty());

    let cfg = CoreConfig::new(PathBuf::from(data_dir), max_upload_bytes)?;
    let filebox = Filebox::open(&cfg)
        .with_context(|| format!("opening data directory {}", cfg.data_dir().display()))?;

    if api_key.is_none() {
        tracing::warn!("API_KEY not set, accepting identity headers from any client");
    }

    let app = router(AppState::new(filebox, api_key, cfg.max_upload_bytes()));

    tracing::info!("++ Starting Filebox REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("binding {rest_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
