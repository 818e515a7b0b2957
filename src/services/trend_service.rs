use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::trend_provider::TrendProvider;
use crate::models::user_preferences::MAX_KEYWORD_CHARS;
use crate::models::{ChangeSignal, TimeSeries, TrendAnalysisResponse};
use crate::services::change_detector::detect_change;
use crate::services::notification_composer::NotificationComposer;
use crate::services::significance::SignificanceFilter;
use crate::store::{PreferenceStore, TrendStore};

/// Trim and check a keyword coming from a request path or a preference.
pub fn validate_keyword(keyword: &str) -> Result<String, AppError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::Validation("keyword must not be empty".to_string()));
    }
    if keyword.chars().count() > MAX_KEYWORD_CHARS {
        return Err(AppError::Validation(format!(
            "keyword must be at most {} characters",
            MAX_KEYWORD_CHARS
        )));
    }
    Ok(keyword.to_string())
}

/// Fetch the series for `keyword`, persisting it when asked.
///
/// Provider failures are not surfaced: the last persisted snapshot is
/// returned instead, or an empty series when there is none.
pub async fn ingest<S>(
    store: &S,
    provider: &dyn TrendProvider,
    keyword: &str,
    persist: bool,
) -> Result<TimeSeries, AppError>
where
    S: TrendStore + ?Sized,
{
    let keyword = validate_keyword(keyword)?;

    match provider.fetch_series(&keyword).await {
        Ok(series) => {
            info!("Fetched {} trend points for '{}'", series.len(), keyword);
            if persist && !series.is_empty() {
                if let Err(e) = store.save_series(&series).await {
                    warn!("Failed to persist trend snapshot for '{}': {}", keyword, e);
                }
            }
            Ok(series)
        }
        Err(e) => {
            warn!("Trend fetch for '{}' failed: {}. Using last snapshot.", keyword, e);
            match store.latest_series(&keyword).await {
                Ok(Some(series)) => Ok(series),
                Ok(None) => Ok(TimeSeries::empty(keyword)),
                Err(e) => {
                    warn!("Failed to load trend snapshot for '{}': {}", keyword, e);
                    Ok(TimeSeries::empty(keyword))
                }
            }
        }
    }
}

/// Last persisted series for `keyword`.
pub async fn latest_series<S>(store: &S, keyword: &str) -> Result<TimeSeries, AppError>
where
    S: TrendStore + ?Sized,
{
    let keyword = validate_keyword(keyword)?;
    store
        .latest_series(&keyword)
        .await?
        .ok_or(AppError::NotFound)
}

/// On-demand analysis of one keyword.
///
/// The threshold is the user's own when `user_id` is given and has saved
/// preferences, `default_filter` otherwise.
pub async fn analyze<S>(
    store: &S,
    provider: &dyn TrendProvider,
    composer: &NotificationComposer,
    default_filter: SignificanceFilter,
    keyword: &str,
    user_id: Option<Uuid>,
) -> Result<TrendAnalysisResponse, AppError>
where
    S: TrendStore + PreferenceStore + ?Sized,
{
    let series = ingest(store, provider, keyword, false).await?;

    let preference = match user_id {
        Some(user_id) => store.get_preference(user_id).await?,
        None => None,
    };
    let filter = default_filter.resolve(preference.as_ref());

    let (change, no_signal_reason) = match detect_change(&series) {
        ChangeSignal::Change(event) => (Some(event), None),
        ChangeSignal::NoSignal(reason) => (None, Some(reason)),
    };

    let significant = change.as_ref().is_some_and(|e| filter.is_significant(e));
    let analysis = match &change {
        Some(event) if significant => Some(composer.compose_analysis(event).await),
        _ => None,
    };

    Ok(TrendAnalysisResponse {
        keyword: series.keyword.clone(),
        series_len: series.len(),
        change,
        no_signal_reason,
        significant,
        threshold_percent: filter.threshold_percent,
        analysis,
    })
}
