use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::models::{TimeSeries, TrendPoint};

#[derive(Debug, FromRow)]
pub struct TrendSnapshotRow {
    pub keyword: String,
    pub points: Json<Vec<TrendPoint>>,
    pub fetched_at: DateTime<Utc>,
}

impl From<TrendSnapshotRow> for TimeSeries {
    fn from(row: TrendSnapshotRow) -> Self {
        TimeSeries::new(row.keyword, row.points.0)
    }
}

/// Replace the stored snapshot for the series' keyword.
pub async fn upsert_snapshot(pool: &PgPool, series: &TimeSeries) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO trend_snapshots (keyword, points, fetched_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (keyword) DO UPDATE SET
            points = EXCLUDED.points,
            fetched_at = EXCLUDED.fetched_at
        "#,
    )
    .bind(&series.keyword)
    .bind(Json(&series.points))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_latest_snapshot(
    pool: &PgPool,
    keyword: &str,
) -> Result<Option<TrendSnapshotRow>, sqlx::Error> {
    sqlx::query_as::<_, TrendSnapshotRow>(
        r#"
        SELECT keyword, points, fetched_at
        FROM trend_snapshots
        WHERE keyword = $1
        "#,
    )
    .bind(keyword)
    .fetch_optional(pool)
    .await
}
