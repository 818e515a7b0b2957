use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CreateNotification, Direction, IconHint, ManualNotificationRequest, Notification,
    NotificationCategory, NotificationQuery,
};
use crate::store::{NotificationStore, StoreError};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

// ==============================================================================
// Delivery
// ==============================================================================

/// Write a composed notification to the user's inbox
pub async fn deliver<S>(store: &S, notification: CreateNotification) -> Result<Notification, StoreError>
where
    S: NotificationStore + ?Sized,
{
    let user_id = notification.user_id;
    match store.insert_notification(notification).await {
        Ok(created) => {
            info!("Delivered notification {} to user {}", created.id, user_id);
            Ok(created)
        }
        Err(e) => {
            warn!("Failed to deliver notification to user {}: {}", user_id, e);
            Err(e)
        }
    }
}

/// Notification from the manual test form
pub async fn create_manual<S>(
    store: &S,
    user_id: Uuid,
    request: ManualNotificationRequest,
) -> Result<Notification, AppError>
where
    S: NotificationStore + ?Sized,
{
    request.validate().map_err(AppError::Validation)?;

    let direction = request.direction.unwrap_or(Direction::Stable);
    let icon_hint = match request.direction {
        Some(direction) => IconHint::for_direction(direction),
        None => IconHint::Info,
    };

    let create = CreateNotification {
        user_id,
        title: request.title.trim().to_string(),
        body: request.body.trim().to_string(),
        direction,
        category: NotificationCategory::Manual,
        icon_hint,
        target_link: request.target_link.filter(|l| !l.trim().is_empty()),
    };

    Ok(deliver(store, create).await?)
}

// ==============================================================================
// Inbox
// ==============================================================================

pub async fn list<S>(
    store: &S,
    user_id: Uuid,
    query: NotificationQuery,
) -> Result<Vec<Notification>, AppError>
where
    S: NotificationStore + ?Sized,
{
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    Ok(store
        .list_notifications(user_id, limit, offset, query.unread_only)
        .await?)
}

pub async fn unread_count<S>(store: &S, user_id: Uuid) -> Result<i64, AppError>
where
    S: NotificationStore + ?Sized,
{
    Ok(store.count_unread(user_id).await?)
}

pub async fn mark_read<S>(
    store: &S,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<Notification, AppError>
where
    S: NotificationStore + ?Sized,
{
    Ok(store.mark_read(user_id, notification_id).await?)
}

pub async fn mark_all_read<S>(store: &S, user_id: Uuid) -> Result<u64, AppError>
where
    S: NotificationStore + ?Sized,
{
    let updated = store.mark_all_read(user_id).await?;
    info!("Marked {} notifications read for user {}", updated, user_id);
    Ok(updated)
}

pub async fn delete<S>(store: &S, user_id: Uuid, notification_id: Uuid) -> Result<(), AppError>
where
    S: NotificationStore + ?Sized,
{
    store.delete_notification(user_id, notification_id).await?;
    info!("Deleted notification {} for user {}", notification_id, user_id);
    Ok(())
}
