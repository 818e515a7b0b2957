use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{CreateNotification, Notification};

#[derive(Debug, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub direction: String,
    pub read: bool,
    pub category: String,
    pub icon_hint: String,
    pub target_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = String;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            body: row.body,
            direction: row.direction.parse()?,
            read: row.read,
            category: row.category.parse()?,
            icon_hint: row.icon_hint.parse()?,
            target_link: row.target_link,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str =
    "id, user_id, title, body, direction, read, category, icon_hint, target_link, created_at";

pub async fn create_notification(
    pool: &PgPool,
    notification: &CreateNotification,
) -> Result<NotificationRow, sqlx::Error> {
    let query = format!(
        r#"
        INSERT INTO notifications (
            user_id, title, body, direction, read, category, icon_hint, target_link
        )
        VALUES ($1, $2, $3, $4, FALSE, $5, $6, $7)
        RETURNING {}
        "#,
        COLUMNS
    );

    sqlx::query_as::<_, NotificationRow>(&query)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.direction.as_str())
        .bind(notification.category.as_str())
        .bind(notification.icon_hint.as_str())
        .bind(&notification.target_link)
        .fetch_one(pool)
        .await
}

pub async fn get_user_notifications(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
    unread_only: bool,
) -> Result<Vec<NotificationRow>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {}
        FROM notifications
        WHERE user_id = $1 AND ($2 = FALSE OR read = FALSE)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
        COLUMNS
    );

    sqlx::query_as::<_, NotificationRow>(&query)
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_unread_notifications(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count.0)
}

pub async fn count_user_notifications(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Returns `RowNotFound` when the notification does not belong to the user.
pub async fn mark_notification_read(
    pool: &PgPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<NotificationRow, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE notifications
        SET read = TRUE
        WHERE id = $1 AND user_id = $2
        RETURNING {}
        "#,
        COLUMNS
    );

    sqlx::query_as::<_, NotificationRow>(&query)
        .bind(notification_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn mark_all_notifications_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_notification(
    pool: &PgPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
