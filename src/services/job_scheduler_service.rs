use crate::errors::AppError;
use crate::external::failure_cache::FailureCache;
use crate::external::trend_provider::TrendProvider;
use crate::jobs::notification_worker_job;
use crate::models::Frequency;
use crate::services::llm_service::LlmService;
use crate::services::notification_composer::NotificationComposer;
use crate::services::significance::SignificanceFilter;
use crate::store::{JobRunStore, Store};
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn Store>,
    pub trend_provider: Arc<dyn TrendProvider>,
    pub trend_failures: FailureCache,
    pub composer: Arc<NotificationComposer>,
    pub llm: Arc<LlmService>,
    pub significance: SignificanceFilter,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
    test_mode: bool,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext, test_mode: bool) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            context,
            test_mode,
        })
    }

    /// Start all scheduled jobs
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("Starting job scheduler...");

        if self.test_mode {
            info!("JOB SCHEDULER IN TEST MODE - notification jobs run every few minutes");
        }

        for frequency in Frequency::ALL {
            let (schedule, description) = frequency_schedule(frequency, self.test_mode);
            self.schedule_job(
                schedule,
                worker_job_name(frequency),
                description,
                move |ctx| async move {
                    notification_worker_job::run_notification_worker(&ctx, frequency)
                        .await
                        .map(JobResult::from)
                },
            )
            .await?;
        }

        self.schedule_job(
            "0 15 * * * *",
            "cleanup_expired_caches",
            "Every hour at :15",
            cleanup_expired_caches,
        )
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("Job scheduler started successfully");
        Ok(())
    }

    /// Stop the scheduler
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        Ok(())
    }

    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        job_name: &'static str,
        description: &str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async(schedule, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            Box::pin(async move {
                let store = context.store.clone();
                let _ = execute_job_with_tracking(store.as_ref(), job_name, job_fn(context)).await;
            })
        })
        .map_err(|e| AppError::External(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        info!("Scheduled: {} - {} [cron: {}]", job_name, description, schedule);
        Ok(())
    }
}

/// Cron expression (sec min hour day month weekday) and description for a frequency.
pub fn frequency_schedule(frequency: Frequency, test_mode: bool) -> (&'static str, &'static str) {
    match (frequency, test_mode) {
        (Frequency::Hourly, false) => ("0 0 * * * *", "Every hour at :00"),
        (Frequency::Daily, false) => ("0 0 7 * * *", "Daily at 7:00 AM"),
        (Frequency::Weekly, false) => ("0 0 7 * * Mon", "Weekly on Monday at 7:00 AM"),
        (Frequency::Hourly, true) => ("0 */1 * * * *", "Every minute (TEST MODE)"),
        (Frequency::Daily, true) => ("0 */2 * * * *", "Every 2 minutes (TEST MODE)"),
        (Frequency::Weekly, true) => ("0 */3 * * * *", "Every 3 minutes (TEST MODE)"),
    }
}

pub fn worker_job_name(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Hourly => "notification_worker_hourly",
        Frequency::Daily => "notification_worker_daily",
        Frequency::Weekly => "notification_worker_weekly",
    }
}

/// Run `job` and record its start, outcome and duration in the job run log.
///
/// Tracking failures are logged and never affect the job's own result.
pub async fn execute_job_with_tracking<S, T, Fut>(
    store: &S,
    job_name: &str,
    job: Fut,
) -> Result<T, AppError>
where
    S: JobRunStore + ?Sized,
    T: Into<JobResult> + Clone,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    info!("Starting job: {}", job_name);
    let started_at = Utc::now();

    let job_id = match store.record_job_start(job_name).await {
        Ok(id) => Some(id),
        Err(e) => {
            error!("Failed to record job start: {}", e);
            None
        }
    };

    let result = job.await;
    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match &result {
        Ok(output) => {
            let job_result: JobResult = output.clone().into();
            info!(
                "Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );

            if let Some(job_id) = job_id {
                if let Err(e) = store
                    .record_job_success(
                        job_id,
                        job_result.items_processed,
                        job_result.items_failed,
                        duration_ms,
                    )
                    .await
                {
                    error!("Failed to record job success: {}", e);
                }
            }
        }
        Err(e) => {
            error!("Job failed: {} - {}", job_name, e);

            if let Some(job_id) = job_id {
                if let Err(e) = store.record_job_failure(job_id, &e.to_string(), duration_ms).await {
                    error!("Failed to record job failure: {}", e);
                }
            }
        }
    }

    result
}

/// Drop expired analysis cache entries, trend failure records and stale
/// LLM rate limit windows
pub async fn cleanup_expired_caches(ctx: JobContext) -> Result<JobResult, AppError> {
    let removed = ctx.composer.cache().clear_expired() + ctx.trend_failures.cleanup_expired();
    ctx.llm.cleanup().await;
    info!("Removed {} expired cache entries", removed);

    Ok(JobResult {
        items_processed: removed as i32,
        items_failed: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::store::InMemoryStore;

    #[test]
    fn test_each_frequency_has_a_distinct_schedule() {
        for test_mode in [false, true] {
            let schedules: std::collections::HashSet<_> = Frequency::ALL
                .iter()
                .map(|f| frequency_schedule(*f, test_mode).0)
                .collect();
            assert_eq!(schedules.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_tracking_records_success() {
        let store = InMemoryStore::new();
        let result = execute_job_with_tracking(&store, "demo", async {
            Ok::<_, AppError>(JobResult {
                items_processed: 3,
                items_failed: 1,
            })
        })
        .await
        .unwrap();
        assert_eq!(result.items_processed, 3);

        let runs = store.recent_job_runs(10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, JobStatus::Success);
        assert_eq!(runs[0].items_failed, Some(1));
    }

    #[tokio::test]
    async fn test_tracking_records_failure() {
        let store = InMemoryStore::new();
        let result = execute_job_with_tracking::<_, JobResult, _>(&store, "demo", async {
            Err(AppError::External("upstream down".to_string()))
        })
        .await;
        assert!(result.is_err());

        let runs = store.recent_job_runs(10).await.unwrap();
        assert_eq!(runs[0].status, JobStatus::Failed);
        assert!(runs[0].error_message.as_deref().unwrap().contains("upstream down"));
    }
}
