//! Persistence seams.
//!
//! Services talk to these traits so the same code runs against Postgres in
//! production and against [`memory::InMemoryStore`] in development and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CreateNotification, Frequency, JobRun, Notification, TimeSeries, UserPreference,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("record not found")]
    NotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Per-user append-only notification records, each markable as read.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(
        &self,
        notification: CreateNotification,
    ) -> Result<Notification, StoreError>;

    /// Newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, StoreError>;

    async fn count_notifications(&self, user_id: Uuid) -> Result<i64, StoreError>;

    /// `NotFound` when the notification does not exist or belongs to another user.
    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid)
        -> Result<Notification, StoreError>;

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError>;

    async fn delete_notification(&self, user_id: Uuid, notification_id: Uuid)
        -> Result<(), StoreError>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preference(&self, user_id: Uuid) -> Result<Option<UserPreference>, StoreError>;

    async fn upsert_preference(
        &self,
        preference: &UserPreference,
    ) -> Result<UserPreference, StoreError>;

    async fn list_enabled_by_frequency(
        &self,
        frequency: Frequency,
    ) -> Result<Vec<UserPreference>, StoreError>;
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn save_series(&self, series: &TimeSeries) -> Result<(), StoreError>;

    async fn latest_series(&self, keyword: &str) -> Result<Option<TimeSeries>, StoreError>;
}

#[async_trait]
pub trait JobRunStore: Send + Sync {
    async fn record_job_start(&self, job_name: &str) -> Result<i64, StoreError>;

    async fn record_job_success(
        &self,
        job_id: i64,
        items_processed: i32,
        items_failed: i32,
        duration_ms: i64,
    ) -> Result<(), StoreError>;

    async fn record_job_failure(
        &self,
        job_id: i64,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError>;

    async fn recent_job_runs(&self, limit: i64) -> Result<Vec<JobRun>, StoreError>;
}

/// Everything the application needs from storage.
pub trait Store: NotificationStore + PreferenceStore + TrendStore + JobRunStore {}

impl<T> Store for T where T: NotificationStore + PreferenceStore + TrendStore + JobRunStore {}
