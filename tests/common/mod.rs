#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};

use umkm_pantau::external::failure_cache::FailureCache;
use umkm_pantau::external::trend_provider::{TrendProvider, TrendProviderError};
use umkm_pantau::models::{TimeSeries, TrendPoint};
use umkm_pantau::services::analysis_cache::BoundedTtlCache;
use umkm_pantau::services::job_scheduler_service::JobContext;
use umkm_pantau::services::llm_service::LlmService;
use umkm_pantau::services::notification_composer::NotificationComposer;
use umkm_pantau::services::significance::SignificanceFilter;
use umkm_pantau::state::AppState;
use umkm_pantau::store::Store;

pub const WORKER_SECRET: &str = "rahasia-worker";

/// Serves fixed series per keyword; unknown keywords fail like an outage.
#[derive(Default)]
pub struct StubTrendProvider {
    series: HashMap<String, Vec<f64>>,
}

impl StubTrendProvider {
    pub fn with(mut self, keyword: &str, values: &[f64]) -> Self {
        self.series.insert(keyword.to_string(), values.to_vec());
        self
    }
}

#[async_trait]
impl TrendProvider for StubTrendProvider {
    async fn fetch_series(&self, keyword: &str) -> Result<TimeSeries, TrendProviderError> {
        let values = self
            .series
            .get(keyword)
            .ok_or_else(|| TrendProviderError::Network("connection refused".to_string()))?;
        let start = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();
        Ok(TimeSeries::new(
            keyword,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| TrendPoint::new(start + ChronoDuration::weeks(i as i64), *v))
                .collect(),
        ))
    }
}

pub fn composer() -> Arc<NotificationComposer> {
    Arc::new(NotificationComposer::new(
        Arc::new(LlmService::disabled()),
        Arc::new(BoundedTtlCache::new(64, Duration::from_secs(60))),
    ))
}

pub fn job_context(store: Arc<dyn Store>, provider: StubTrendProvider) -> JobContext {
    JobContext {
        store,
        trend_provider: Arc::new(provider),
        trend_failures: FailureCache::new(),
        composer: composer(),
        llm: Arc::new(LlmService::disabled()),
        significance: SignificanceFilter::default(),
        concurrency: 3,
    }
}

pub fn app_state(store: Arc<dyn Store>, provider: StubTrendProvider) -> AppState {
    AppState {
        store,
        trend_provider: Arc::new(provider),
        trend_failures: FailureCache::new(),
        llm: Arc::new(LlmService::disabled()),
        composer: composer(),
        significance: SignificanceFilter::default(),
        worker_secret: Some(Arc::from(WORKER_SECRET)),
        worker_concurrency: 2,
    }
}
