mod app;
mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Settings;
use crate::db::{MarketStore, PgStore};
use crate::external::{AtlasCloudProvider, GenerationProvider, GoogleAiProvider};
use crate::logging::{init_logging, LoggingConfig};
use crate::services::ai_service::AiClient;
use crate::services::broadcast_service::Broadcaster;
use crate::services::event_detection_service::{EventDetector, MarketEventDetector};
use crate::services::job_scheduler_service::{JobContext, JobSchedulerService};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!("logging: {}", e))?;

    let settings = Settings::from_env().context("invalid configuration")?;
    info!(
        "Market day duration: {}s ({} snapshots every {}s)",
        settings.market_day_duration().as_secs(),
        settings.market.snapshots_per_market_day,
        settings.scheduler.snapshot_interval.as_secs()
    );

    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("✅ Database migrations applied");

    let store: Arc<dyn MarketStore> = Arc::new(PgStore::new(pool));

    let providers: Vec<Arc<dyn GenerationProvider>> = vec![
        Arc::new(AtlasCloudProvider::new(&settings.ai)?),
        Arc::new(GoogleAiProvider::new(&settings.ai)?),
    ];
    let ai = Arc::new(AiClient::new(providers, settings.ai.force_google_ai));

    let broadcaster = Broadcaster::new();
    let event_detector: Arc<dyn EventDetector> = Arc::new(MarketEventDetector::default());

    let context = JobContext {
        store,
        broadcaster: broadcaster.clone(),
        event_detector,
        ai,
        market: settings.market.clone(),
        ai_config: Arc::new(settings.ai.clone()),
    };

    let mut scheduler = JobSchedulerService::new(context, settings.scheduler.clone()).await?;
    scheduler.start().await?;

    let app = app::create_app(AppState { broadcaster });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server_port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🚀 Exchange game backend running at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    info!("👋 Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
