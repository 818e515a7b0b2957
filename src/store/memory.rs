use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{JobRunStore, NotificationStore, PreferenceStore, StoreError, TrendStore};
use crate::models::{
    CreateNotification, Frequency, JobRun, JobStatus, Notification, TimeSeries, UserPreference,
};

#[derive(Default)]
struct Inner {
    notifications: Vec<Notification>,
    preferences: HashMap<Uuid, UserPreference>,
    series: HashMap<String, TimeSeries>,
    job_runs: Vec<JobRun>,
}

/// Process-local store used when no `DATABASE_URL` is configured and in tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total notifications across all users.
    pub fn notification_count(&self) -> usize {
        self.inner.read().notifications.len()
    }

    /// Stored trend snapshots, one per keyword.
    pub fn snapshot_count(&self) -> usize {
        self.inner.read().series.len()
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(
        &self,
        notification: CreateNotification,
    ) -> Result<Notification, StoreError> {
        let notification = notification.into_notification();
        self.inner.write().notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let inner = self.inner.read();
        let mut items: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        // Stable sort keeps insertion order reversed for equal timestamps.
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(items
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as i64)
    }

    async fn count_notifications(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .count() as i64)
    }

    async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification, StoreError> {
        let mut inner = self.inner.write();
        let notification = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let mut updated = 0;
        for notification in inner
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.id == notification_id && n.user_id == user_id));
        if inner.notifications.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn get_preference(&self, user_id: Uuid) -> Result<Option<UserPreference>, StoreError> {
        Ok(self.inner.read().preferences.get(&user_id).cloned())
    }

    async fn upsert_preference(
        &self,
        preference: &UserPreference,
    ) -> Result<UserPreference, StoreError> {
        let mut inner = self.inner.write();
        let mut stored = preference.clone();
        if let Some(existing) = inner.preferences.get(&preference.user_id) {
            stored.created_at = existing.created_at;
        }
        stored.updated_at = Utc::now();
        inner.preferences.insert(stored.user_id, stored.clone());
        Ok(stored)
    }

    async fn list_enabled_by_frequency(
        &self,
        frequency: Frequency,
    ) -> Result<Vec<UserPreference>, StoreError> {
        let inner = self.inner.read();
        let mut prefs: Vec<UserPreference> = inner
            .preferences
            .values()
            .filter(|p| p.notifications_enabled && p.frequency == frequency)
            .cloned()
            .collect();
        prefs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(prefs)
    }
}

#[async_trait]
impl TrendStore for InMemoryStore {
    async fn save_series(&self, series: &TimeSeries) -> Result<(), StoreError> {
        self.inner
            .write()
            .series
            .insert(series.keyword.clone(), series.clone());
        Ok(())
    }

    async fn latest_series(&self, keyword: &str) -> Result<Option<TimeSeries>, StoreError> {
        Ok(self.inner.read().series.get(keyword).cloned())
    }
}

#[async_trait]
impl JobRunStore for InMemoryStore {
    async fn record_job_start(&self, job_name: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.write();
        let id = inner.job_runs.len() as i64 + 1;
        inner.job_runs.push(JobRun {
            id,
            job_name: job_name.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            items_processed: None,
            items_failed: None,
            error_message: None,
            duration_ms: None,
        });
        Ok(id)
    }

    async fn record_job_success(
        &self,
        job_id: i64,
        items_processed: i32,
        items_failed: i32,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let run = inner
            .job_runs
            .iter_mut()
            .find(|r| r.id == job_id)
            .ok_or(StoreError::NotFound)?;
        run.status = JobStatus::Success;
        run.completed_at = Some(Utc::now());
        run.items_processed = Some(items_processed);
        run.items_failed = Some(items_failed);
        run.duration_ms = Some(duration_ms);
        Ok(())
    }

    async fn record_job_failure(
        &self,
        job_id: i64,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let run = inner
            .job_runs
            .iter_mut()
            .find(|r| r.id == job_id)
            .ok_or(StoreError::NotFound)?;
        run.status = JobStatus::Failed;
        run.completed_at = Some(Utc::now());
        run.error_message = Some(error_message.to_string());
        run.duration_ms = Some(duration_ms);
        Ok(())
    }

    async fn recent_job_runs(&self, limit: i64) -> Result<Vec<JobRun>, StoreError> {
        Ok(self
            .inner
            .read()
            .job_runs
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, IconHint, NotificationCategory};

    fn create_for(user_id: Uuid, title: &str) -> CreateNotification {
        CreateNotification {
            user_id,
            title: title.to_string(),
            body: "isi".to_string(),
            direction: Direction::Up,
            category: NotificationCategory::PriceChange,
            icon_hint: IconHint::TrendingUp,
            target_link: None,
        }
    }

    #[tokio::test]
    async fn test_notifications_are_scoped_per_user() {
        let store = InMemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let n = store.insert_notification(create_for(alice, "a")).await.unwrap();
        store.insert_notification(create_for(bob, "b")).await.unwrap();

        assert_eq!(store.count_notifications(alice).await.unwrap(), 1);
        assert!(matches!(
            store.mark_read(bob, n.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_notification(bob, n.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        for title in ["pertama", "kedua", "ketiga"] {
            store.insert_notification(create_for(user, title)).await.unwrap();
        }

        let page = store.list_notifications(user, 2, 0, false).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "ketiga");

        let rest = store.list_notifications(user, 2, 2, false).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].title, "pertama");
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_notification(create_for(user, "a")).await.unwrap();
        store.insert_notification(create_for(user, "b")).await.unwrap();

        assert_eq!(store.count_unread(user).await.unwrap(), 2);
        assert_eq!(store.mark_all_read(user).await.unwrap(), 2);
        assert_eq!(store.count_unread(user).await.unwrap(), 0);
        assert_eq!(store.mark_all_read(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_run_lifecycle() {
        let store = InMemoryStore::new();
        let id = store.record_job_start("notify_daily").await.unwrap();
        store.record_job_success(id, 3, 1, 42).await.unwrap();

        let runs = store.recent_job_runs(10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, JobStatus::Success);
        assert_eq!(runs[0].items_processed, Some(3));
    }
}
