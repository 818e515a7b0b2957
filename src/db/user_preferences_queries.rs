use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{Frequency, UserPreference};

#[derive(Debug, FromRow)]
pub struct UserPreferenceRow {
    pub user_id: Uuid,
    pub notifications_enabled: bool,
    pub frequency: String,
    pub change_threshold_percent: f64,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserPreferenceRow> for UserPreference {
    type Error = String;

    fn try_from(row: UserPreferenceRow) -> Result<Self, Self::Error> {
        Ok(UserPreference {
            user_id: row.user_id,
            notifications_enabled: row.notifications_enabled,
            frequency: row.frequency.parse()?,
            change_threshold_percent: row.change_threshold_percent,
            keywords: row.keywords,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Get notification preferences by user ID
pub async fn get_by_user_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserPreferenceRow>, sqlx::Error> {
    sqlx::query_as::<_, UserPreferenceRow>(
        r#"
        SELECT user_id, notifications_enabled, frequency, change_threshold_percent,
               keywords, created_at, updated_at
        FROM user_notification_preferences
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Create or replace a user's preferences
pub async fn upsert(
    pool: &PgPool,
    preference: &UserPreference,
) -> Result<UserPreferenceRow, sqlx::Error> {
    sqlx::query_as::<_, UserPreferenceRow>(
        r#"
        INSERT INTO user_notification_preferences (
            user_id, notifications_enabled, frequency, change_threshold_percent,
            keywords, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (user_id)
        DO UPDATE SET
            notifications_enabled = EXCLUDED.notifications_enabled,
            frequency = EXCLUDED.frequency,
            change_threshold_percent = EXCLUDED.change_threshold_percent,
            keywords = EXCLUDED.keywords,
            updated_at = NOW()
        RETURNING user_id, notifications_enabled, frequency, change_threshold_percent,
                  keywords, created_at, updated_at
        "#,
    )
    .bind(preference.user_id)
    .bind(preference.notifications_enabled)
    .bind(preference.frequency.as_str())
    .bind(preference.change_threshold_percent)
    .bind(&preference.keywords)
    .bind(preference.created_at)
    .fetch_one(pool)
    .await
}

/// Users with notifications enabled at the given frequency
pub async fn list_enabled_by_frequency(
    pool: &PgPool,
    frequency: Frequency,
) -> Result<Vec<UserPreferenceRow>, sqlx::Error> {
    sqlx::query_as::<_, UserPreferenceRow>(
        r#"
        SELECT user_id, notifications_enabled, frequency, change_threshold_percent,
               keywords, created_at, updated_at
        FROM user_notification_preferences
        WHERE notifications_enabled = TRUE AND frequency = $1
        ORDER BY created_at
        "#,
    )
    .bind(frequency.as_str())
    .fetch_all(pool)
    .await
}
