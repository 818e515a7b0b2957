use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::external::trend_provider::{TrendProvider, TrendProviderError};
use crate::models::TimeSeries;

/// Information about a failed trend fetch for a keyword
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub error_type: FailureType,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    RateLimited,
    Upstream,
}

impl FailureType {
    /// `None` for errors that retrying later cannot fix differently.
    pub fn classify(error: &TrendProviderError) -> Option<Self> {
        match error {
            TrendProviderError::RateLimited => Some(FailureType::RateLimited),
            TrendProviderError::Network(_)
            | TrendProviderError::BadResponse(_)
            | TrendProviderError::Parse(_) => Some(FailureType::Upstream),
            TrendProviderError::NotConfigured(_) | TrendProviderError::RecentlyFailed(_) => None,
        }
    }

    fn ttl_minutes(self) -> i64 {
        match self {
            FailureType::RateLimited => 60,
            FailureType::Upstream => 15,
        }
    }
}

/// Thread-safe record of keywords whose last fetch failed, so the trends
/// quota is not spent on calls that will fail again.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<String, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Still-valid failure for `keyword`, if any
    pub fn is_failed(&self, keyword: &str) -> Option<FailureInfo> {
        let info = self.cache.get(keyword).map(|entry| entry.value().clone())?;
        if Utc::now() < info.failed_at + Duration::minutes(info.ttl_minutes) {
            return Some(info);
        }
        self.cache.remove(keyword);
        None
    }

    pub fn record_failure(&self, keyword: &str, error_type: FailureType) {
        let info = FailureInfo {
            failed_at: Utc::now(),
            error_type,
            ttl_minutes: error_type.ttl_minutes(),
        };
        self.cache.insert(keyword.to_string(), info);
    }

    pub fn clear(&self, keyword: &str) {
        self.cache.remove(keyword);
    }

    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.cache.len();
        self.cache
            .retain(|_, info| now < info.failed_at + Duration::minutes(info.ttl_minutes));
        let removed = before - self.cache.len();
        if removed > 0 {
            info!("Cleaned up {} expired trend failure entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Wraps a provider and skips keywords that failed recently.
pub struct FailureAwareTrendProvider {
    inner: Arc<dyn TrendProvider>,
    failures: FailureCache,
}

impl FailureAwareTrendProvider {
    pub fn new(inner: Arc<dyn TrendProvider>, failures: FailureCache) -> Self {
        Self { inner, failures }
    }
}

#[async_trait]
impl TrendProvider for FailureAwareTrendProvider {
    async fn fetch_series(&self, keyword: &str) -> Result<TimeSeries, TrendProviderError> {
        if let Some(info) = self.failures.is_failed(keyword) {
            debug!("Skipping fetch for '{}' ({:?} at {})", keyword, info.error_type, info.failed_at);
            return Err(TrendProviderError::RecentlyFailed(keyword.to_string()));
        }

        match self.inner.fetch_series(keyword).await {
            Ok(series) => {
                self.failures.clear(keyword);
                Ok(series)
            }
            Err(e) => {
                if let Some(kind) = FailureType::classify(&e) {
                    self.failures.record_failure(keyword, kind);
                }
                Err(e)
            }
        }
    }
}
