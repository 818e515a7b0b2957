use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::JobRun;

#[derive(Debug, FromRow)]
pub struct JobRunRow {
    pub id: i64,
    pub job_name: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items_processed: Option<i32>,
    pub items_failed: Option<i32>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
}

impl TryFrom<JobRunRow> for JobRun {
    type Error = String;

    fn try_from(row: JobRunRow) -> Result<Self, Self::Error> {
        Ok(JobRun {
            id: row.id,
            job_name: row.job_name,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            items_processed: row.items_processed,
            items_failed: row.items_failed,
            error_message: row.error_message,
            duration_ms: row.duration_ms,
        })
    }
}

pub async fn record_job_start(pool: &PgPool, job_name: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO job_runs (job_name, status, started_at)
        VALUES ($1, 'running', NOW())
        RETURNING id
        "#,
    )
    .bind(job_name)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

pub async fn record_job_success(
    pool: &PgPool,
    job_id: i64,
    items_processed: i32,
    items_failed: i32,
    duration_ms: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE job_runs
        SET completed_at = NOW(),
            status = 'success',
            items_processed = $2,
            items_failed = $3,
            duration_ms = $4
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(items_processed)
    .bind(items_failed)
    .bind(duration_ms)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn record_job_failure(
    pool: &PgPool,
    job_id: i64,
    error_message: &str,
    duration_ms: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE job_runs
        SET completed_at = NOW(),
            status = 'failed',
            error_message = $2,
            duration_ms = $3
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(error_message)
    .bind(duration_ms)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_recent_job_runs(pool: &PgPool, limit: i64) -> Result<Vec<JobRunRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRunRow>(
        r#"
        SELECT id, job_name, status, started_at, completed_at,
               items_processed, items_failed, error_message, duration_ms
        FROM job_runs
        ORDER BY started_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
