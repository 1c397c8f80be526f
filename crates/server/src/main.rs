//! HTTP entry point for the NGCF recommender.
//!
//! Loads the artifacts, runs propagation once, then serves requests.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::Config;
use server::Recommender;
use server::api::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting NGCF recommender with {:?}", config);

    // Nothing is served until propagation has finished
    let artifacts_dir = config.artifacts_dir.clone();
    let match_cutoff = config.match_cutoff;
    let recommender =
        tokio::task::spawn_blocking(move || Recommender::load(&artifacts_dir, match_cutoff))
            .await
            .context("Startup task panicked")??;

    let app = create_router(AppState::new(recommender, config.top_k));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
