use async_trait::async_trait;
use thiserror::Error;

use crate::models::TimeSeries;

#[derive(Debug, Error)]
pub enum TrendProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("skipped after a recent failure: {0}")]
    RecentlyFailed(String),
}

/// Source of search-interest time series for a keyword.
#[async_trait]
pub trait TrendProvider: Send + Sync {
    async fn fetch_series(&self, keyword: &str) -> Result<TimeSeries, TrendProviderError>;
}

/// Provider used when no trends API key is configured. Every fetch fails,
/// which sends callers down the persisted-snapshot fallback.
pub struct UnconfiguredTrendProvider;

#[async_trait]
impl TrendProvider for UnconfiguredTrendProvider {
    async fn fetch_series(&self, _keyword: &str) -> Result<TimeSeries, TrendProviderError> {
        Err(TrendProviderError::NotConfigured(
            "SERPAPI_API_KEY is not set".to_string(),
        ))
    }
}
