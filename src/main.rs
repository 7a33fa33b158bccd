use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use race_replay::{config::ServerConfig, web, FileSessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::load()?;
    if !cfg.cache_dir.is_dir() {
        tracing::warn!("cache dir {} does not exist; every race request will fail", cfg.cache_dir.display());
    }
    tracing::info!(
        "serving sessions from {}; seasons {}..={}",
        cfg.cache_dir.display(),
        cfg.first_season,
        cfg.latest_season
    );

    let state = web::AppState {
        loader: Arc::new(FileSessionStore::new(&cfg.cache_dir)),
        seasons: Arc::new(cfg.seasons()),
    };

    let app = web::router(state)
        .layer(web::cors_layer(&cfg.allowed_origins)?)
        .layer(TraceLayer::new_for_http());

    tracing::info!("listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
