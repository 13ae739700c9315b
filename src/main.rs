mod api;
mod config;
mod db;
mod display;
mod error;
mod fetcher;
mod radar_refresh;
mod ranking;
mod scorer;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::{Config, CACHE_BLOB_KEY};
use crate::db::{BlobStore, MemoryBlobStore, SqliteBlobStore};
use crate::display::DisplayState;
use crate::error::Result;
use crate::fetcher::MarketFetcher;
use crate::radar_refresh::{RadarController, RefreshScheduler};
use crate::state::CacheStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Blob substrate ---
    let blobs: Arc<dyn BlobStore> = if cfg.db_path == ":memory:" {
        warn!("RADAR_DB_PATH is :memory:, cache will not survive a restart");
        Arc::new(MemoryBlobStore::new())
    } else {
        Arc::new(SqliteBlobStore::open(&cfg.db_path).await?)
    };
    let store = CacheStore::new(blobs, CACHE_BLOB_KEY);

    // --- Radar context ---
    let source = Arc::new(MarketFetcher::new(cfg.fetch.clone())?);
    let display = Arc::new(DisplayState::new());
    let controller = Arc::new(
        RadarController::open(
            source,
            store,
            display.clone(),
            cfg.scoring.clone(),
            cfg.retention,
        )
        .await,
    );
    info!(
        "Radar ready: discovery={} enrich={} batch_size={} retention={}h",
        cfg.fetch.discovery_url,
        cfg.fetch.enrich_url,
        cfg.fetch.batch_size,
        cfg.retention.as_secs() / 3600,
    );

    // Periodic refresh (first tick fires immediately)
    let scheduler = RefreshScheduler::start(Arc::clone(&controller), cfg.refresh_interval);

    // HTTP API server
    let app = router(ApiState { controller, display });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => {
                    warn!("Failed to listen for ctrl-c, running until killed: {e}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    if scheduler.is_running() {
        info!("Stopping refresh scheduler");
    }
    scheduler.shutdown().await;
    Ok(())
}
