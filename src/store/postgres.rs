use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{JobRunStore, NotificationStore, PreferenceStore, StoreError, TrendStore};
use crate::db::{job_run_queries, notification_queries, trend_queries, user_preferences_queries};
use crate::models::{
    CreateNotification, Frequency, JobRun, Notification, TimeSeries, UserPreference,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode<R, T>(row: R) -> Result<T, StoreError>
where
    T: TryFrom<R, Error = String>,
{
    T::try_from(row).map_err(StoreError::Database)
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        notification: CreateNotification,
    ) -> Result<Notification, StoreError> {
        let row = notification_queries::create_notification(&self.pool, &notification).await?;
        decode(row)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        notification_queries::get_user_notifications(&self.pool, user_id, limit, offset, unread_only)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(notification_queries::count_unread_notifications(&self.pool, user_id).await?)
    }

    async fn count_notifications(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(notification_queries::count_user_notifications(&self.pool, user_id).await?)
    }

    async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification, StoreError> {
        let row =
            notification_queries::mark_notification_read(&self.pool, user_id, notification_id)
                .await?;
        decode(row)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(notification_queries::mark_all_notifications_read(&self.pool, user_id).await?)
    }

    async fn delete_notification(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<(), StoreError> {
        let affected =
            notification_queries::delete_notification(&self.pool, user_id, notification_id)
                .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn get_preference(&self, user_id: Uuid) -> Result<Option<UserPreference>, StoreError> {
        user_preferences_queries::get_by_user_id(&self.pool, user_id)
            .await?
            .map(decode)
            .transpose()
    }

    async fn upsert_preference(
        &self,
        preference: &UserPreference,
    ) -> Result<UserPreference, StoreError> {
        let row = user_preferences_queries::upsert(&self.pool, preference).await?;
        decode(row)
    }

    async fn list_enabled_by_frequency(
        &self,
        frequency: Frequency,
    ) -> Result<Vec<UserPreference>, StoreError> {
        user_preferences_queries::list_enabled_by_frequency(&self.pool, frequency)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[async_trait]
impl TrendStore for PgStore {
    async fn save_series(&self, series: &TimeSeries) -> Result<(), StoreError> {
        Ok(trend_queries::upsert_snapshot(&self.pool, series).await?)
    }

    async fn latest_series(&self, keyword: &str) -> Result<Option<TimeSeries>, StoreError> {
        Ok(trend_queries::get_latest_snapshot(&self.pool, keyword)
            .await?
            .map(TimeSeries::from))
    }
}

#[async_trait]
impl JobRunStore for PgStore {
    async fn record_job_start(&self, job_name: &str) -> Result<i64, StoreError> {
        Ok(job_run_queries::record_job_start(&self.pool, job_name).await?)
    }

    async fn record_job_success(
        &self,
        job_id: i64,
        items_processed: i32,
        items_failed: i32,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        Ok(job_run_queries::record_job_success(
            &self.pool,
            job_id,
            items_processed,
            items_failed,
            duration_ms,
        )
        .await?)
    }

    async fn record_job_failure(
        &self,
        job_id: i64,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        Ok(job_run_queries::record_job_failure(&self.pool, job_id, error_message, duration_ms).await?)
    }

    async fn recent_job_runs(&self, limit: i64) -> Result<Vec<JobRun>, StoreError> {
        job_run_queries::get_recent_job_runs(&self.pool, limit)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}
