use std::sync::Arc;

use crate::config::AppConfig;
use crate::external::failure_cache::FailureCache;
use crate::external::trend_provider::TrendProvider;
use crate::services::job_scheduler_service::JobContext;
use crate::services::llm_service::LlmService;
use crate::services::notification_composer::NotificationComposer;
use crate::services::significance::SignificanceFilter;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub trend_provider: Arc<dyn TrendProvider>,
    pub trend_failures: FailureCache,
    pub llm: Arc<LlmService>,
    pub composer: Arc<NotificationComposer>,
    pub significance: SignificanceFilter,
    /// Bearer token for the worker endpoints. `None` rejects every call.
    pub worker_secret: Option<Arc<str>>,
    pub worker_concurrency: usize,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn Store>,
        trend_provider: Arc<dyn TrendProvider>,
        trend_failures: FailureCache,
        llm: Arc<LlmService>,
        composer: Arc<NotificationComposer>,
    ) -> Self {
        Self {
            store,
            trend_provider,
            trend_failures,
            llm,
            composer,
            significance: SignificanceFilter::new(config.significance_threshold_percent),
            worker_secret: config.worker.secret.as_deref().map(Arc::from),
            worker_concurrency: config.worker.concurrency,
        }
    }

    pub fn job_context(&self) -> JobContext {
        JobContext {
            store: self.store.clone(),
            trend_provider: self.trend_provider.clone(),
            trend_failures: self.trend_failures.clone(),
            composer: self.composer.clone(),
            llm: self.llm.clone(),
            significance: self.significance,
            concurrency: self.worker_concurrency,
        }
    }
}
