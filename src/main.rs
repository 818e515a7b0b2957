use std::sync::Arc;

use anyhow::{anyhow, Context};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use umkm_pantau::app;
use umkm_pantau::config::AppConfig;
use umkm_pantau::external::failure_cache::{FailureAwareTrendProvider, FailureCache};
use umkm_pantau::external::serpapi::SerpApiTrendsProvider;
use umkm_pantau::external::trend_provider::{TrendProvider, UnconfiguredTrendProvider};
use umkm_pantau::logging::init_logging;
use umkm_pantau::services::analysis_cache::BoundedTtlCache;
use umkm_pantau::services::job_scheduler_service::JobSchedulerService;
use umkm_pantau::services::llm_service::LlmService;
use umkm_pantau::services::notification_composer::NotificationComposer;
use umkm_pantau::state::AppState;
use umkm_pantau::store::{InMemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;

    // Initialize logging FIRST
    init_logging(config.logging.clone()).map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            info!("Using Postgres store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(InMemoryStore::new())
        }
    };

    let trend_failures = FailureCache::new();
    let trend_provider: Arc<dyn TrendProvider> = match SerpApiTrendsProvider::new(&config.trends) {
        Ok(provider) => {
            info!("Using trend provider: SerpApi Google Trends (geo: {})", config.trends.geo);
            Arc::new(FailureAwareTrendProvider::new(
                Arc::new(provider),
                trend_failures.clone(),
            ))
        }
        Err(e) => {
            warn!("Trend provider unavailable: {}. Serving persisted snapshots only.", e);
            Arc::new(UnconfiguredTrendProvider)
        }
    };

    let llm = Arc::new(LlmService::new(&config.llm));
    let cache = Arc::new(BoundedTtlCache::from_config(&config.cache));
    let composer = Arc::new(NotificationComposer::new(llm.clone(), cache));

    let state = AppState::new(&config, store, trend_provider, trend_failures, llm, composer);

    let mut scheduler = if config.worker.scheduler_enabled {
        let mut scheduler =
            JobSchedulerService::new(state.job_context(), config.worker.scheduler_test_mode).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        info!("Job scheduler disabled (JOB_SCHEDULER_ENABLED=false)");
        None
    };

    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("UMKM Pantau backend running at http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.stop().await {
            error!("Failed to stop job scheduler: {}", e);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
