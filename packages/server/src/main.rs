use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use common::storage::filesystem::FilesystemBlobStore;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use village_server::config::AppConfig;
use village_server::state::AppState;
use village_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db).await?;
    if let Some(admin) = &config.auth.bootstrap_admin {
        seed::seed_bootstrap_admin(&db, admin).await?;
    }

    let blob_store = FilesystemBlobStore::new(config.storage.uploads_root.clone())
        .await
        .with_context(|| {
            format!(
                "Failed to open uploads directory {}",
                config.storage.uploads_root.display()
            )
        })?;
    info!(root = %config.storage.uploads_root.display(), "Blob store ready");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.storage.probe_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let cors = cors_layer(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        blob_store: Arc::new(blob_store),
        http,
        config,
    };
    let app = build_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let origins = config
        .server
        .cors
        .allow_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.server.cors.max_age)))
}
