use std::collections::{BTreeSet, HashMap};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::models::{ChangeEvent, Frequency, UserPreference, WorkerRunSummary};
use crate::services::change_detector::detect_change;
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::{notification_service, trend_service, user_preference_service};

impl From<WorkerRunSummary> for JobResult {
    fn from(summary: WorkerRunSummary) -> Self {
        JobResult {
            items_processed: summary.users_processed as i32,
            items_failed: summary.users_failed as i32,
        }
    }
}

#[derive(Debug, Default)]
struct UserOutcome {
    significant: usize,
    created: usize,
    failed: bool,
}

/// Main entry point for the notification worker.
///
/// This job:
/// 1. Selects users with notifications enabled at `frequency`
/// 2. Ingests every keyword they follow once, persisting the snapshot
/// 3. For each user, writes one notification per followed keyword whose
///    change passes that user's threshold
///
/// Users are processed concurrently up to `ctx.concurrency`; a storage
/// failure marks that user failed and the rest of the batch continues.
/// Nothing is de-duplicated: running twice on the same data writes the same
/// notifications twice.
pub async fn run_notification_worker(
    ctx: &JobContext,
    frequency: Frequency,
) -> Result<WorkerRunSummary, AppError> {
    info!("Starting notification worker for frequency: {}", frequency);

    let store = ctx.store.as_ref();
    let users = user_preference_service::list_eligible(store, frequency).await?;

    let mut summary = WorkerRunSummary {
        frequency: Some(frequency),
        users_considered: users.len(),
        ..Default::default()
    };

    if users.is_empty() {
        info!("No users subscribed at frequency {}", frequency);
        return Ok(summary);
    }

    let keywords: BTreeSet<String> = users
        .iter()
        .flat_map(|u| u.keywords.iter().cloned())
        .collect();
    info!("Fetching {} keywords for {} users", keywords.len(), users.len());

    let concurrency = ctx.concurrency.max(1);
    let fetched: Vec<(String, Option<ChangeEvent>)> = stream::iter(keywords)
        .map(move |keyword| async move {
            match trend_service::ingest(store, ctx.trend_provider.as_ref(), &keyword, true).await {
                Ok(series) => {
                    let event = detect_change(&series).into_event();
                    (keyword, event)
                }
                Err(e) => {
                    warn!("Skipping keyword '{}': {}", keyword, e);
                    (keyword, None)
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    summary.keywords_fetched = fetched.len();
    let events: HashMap<String, ChangeEvent> = fetched
        .into_iter()
        .filter_map(|(keyword, event)| event.map(|e| (keyword, e)))
        .collect();

    let events = &events;
    let outcomes: Vec<UserOutcome> = stream::iter(users)
        .map(move |pref| process_user(ctx, events, pref))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for outcome in outcomes {
        summary.events_significant += outcome.significant;
        summary.notifications_created += outcome.created;
        if outcome.failed {
            summary.users_failed += 1;
        } else {
            summary.users_processed += 1;
        }
    }

    info!(
        "Notification worker ({}) completed: {} users processed, {} failed, {} notifications created",
        frequency, summary.users_processed, summary.users_failed, summary.notifications_created
    );

    Ok(summary)
}

async fn process_user(
    ctx: &JobContext,
    events: &HashMap<String, ChangeEvent>,
    pref: UserPreference,
) -> UserOutcome {
    let filter = ctx.significance.resolve(Some(&pref));
    let significant = filter.filter(pref.keywords.iter().filter_map(|k| events.get(k)));

    let mut outcome = UserOutcome {
        significant: significant.len(),
        ..Default::default()
    };
    debug!(
        "User {} has {} significant changes (threshold {:.2}%)",
        pref.user_id, outcome.significant, filter.threshold_percent
    );

    for event in significant {
        let notification = ctx.composer.compose(event, pref.user_id).await;
        match notification_service::deliver(ctx.store.as_ref(), notification).await {
            Ok(_) => outcome.created += 1,
            Err(e) => {
                error!("Notification worker failed for user {}: {}", pref.user_id, e);
                outcome.failed = true;
                break;
            }
        }
    }

    outcome
}
