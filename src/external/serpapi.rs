use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::TrendProviderConfig;
use crate::external::trend_provider::{TrendProvider, TrendProviderError};
use crate::models::{TimeSeries, TrendPoint};

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

/// Google Trends interest-over-time through SerpApi
pub struct SerpApiTrendsProvider {
    client: reqwest::Client,
    api_key: String,
    geo: String,
    date_range: String,
    base_url: String,
}

impl SerpApiTrendsProvider {
    pub fn new(config: &TrendProviderConfig) -> Result<Self, TrendProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TrendProviderError::NotConfigured("SERPAPI_API_KEY not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            geo: config.geo.clone(),
            date_range: config.date_range.clone(),
            base_url: SERPAPI_URL.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiTrendsResponse {
    interest_over_time: Option<SerpApiInterestOverTime>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiInterestOverTime {
    #[serde(default)]
    timeline_data: Vec<SerpApiTimelineEntry>,
}

#[derive(Debug, Deserialize)]
struct SerpApiTimelineEntry {
    timestamp: String,
    #[serde(default)]
    values: Vec<SerpApiValue>,
}

#[derive(Debug, Deserialize)]
struct SerpApiValue {
    extracted_value: Option<f64>,
    value: Option<String>,
}

impl SerpApiValue {
    fn numeric(&self) -> Option<f64> {
        self.extracted_value.or_else(|| {
            let raw = self.value.as_deref()?.trim();
            // "<1" is very low interest, extracted as 0 by SerpApi
            if raw.starts_with('<') {
                return Some(0.0);
            }
            raw.parse::<f64>().ok()
        })
    }
}

/// Map the provider payload into a chronological series. Rows with an
/// unreadable timestamp or value are skipped.
fn to_series(keyword: &str, response: SerpApiTrendsResponse) -> Result<TimeSeries, TrendProviderError> {
    if let Some(error) = response.error {
        // SerpApi reports "no results" as an error string; that is an empty series.
        if error.to_lowercase().contains("hasn't returned any results") {
            return Ok(TimeSeries::empty(keyword));
        }
        return Err(TrendProviderError::BadResponse(error));
    }

    let timeline = response
        .interest_over_time
        .map(|i| i.timeline_data)
        .unwrap_or_default();

    let mut skipped = 0;
    let points: Vec<TrendPoint> = timeline
        .into_iter()
        .filter_map(|entry| {
            let point = entry
                .timestamp
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .zip(entry.values.first().and_then(SerpApiValue::numeric))
                .map(|(ts, value)| TrendPoint::new(ts, value));
            if point.is_none() {
                skipped += 1;
            }
            point
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {} unreadable trend rows for '{}'", skipped, keyword);
    }

    Ok(TimeSeries::new(keyword, points))
}

#[async_trait]
impl TrendProvider for SerpApiTrendsProvider {
    async fn fetch_series(&self, keyword: &str) -> Result<TimeSeries, TrendProviderError> {
        info!("Fetching trend series for '{}' (geo: {}, date: {})", keyword, self.geo, self.date_range);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", "google_trends"),
                ("data_type", "TIMESERIES"),
                ("q", keyword),
                ("geo", self.geo.as_str()),
                ("date", self.date_range.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TrendProviderError::Network(e.to_string()))?;

        let status = response.status();

        if status == 429 {
            return Err(TrendProviderError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TrendProviderError::BadResponse(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let payload: SerpApiTrendsResponse = response
            .json()
            .await
            .map_err(|e| TrendProviderError::Parse(e.to_string()))?;

        let series = to_series(keyword, payload)?;
        info!("Fetched {} trend points for '{}'", series.len(), keyword);
        Ok(series)
    }
}
