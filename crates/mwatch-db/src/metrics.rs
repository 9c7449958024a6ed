//! Read-only aggregates over a project's mentions.
//!
//! Mentions are dated by `published_at`, falling back to `ingested_at` for
//! sources that do not report a publish time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const TOP_N: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Dashboard summary for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectMetrics {
    pub total_mentions: i64,
    /// Mentions per UTC day, oldest first.
    pub volume: Vec<DailyCount>,
    pub sentiment_share: Vec<LabelCount>,
    pub top_sources: Vec<LabelCount>,
    pub top_authors: Vec<LabelCount>,
}

/// Compute [`ProjectMetrics`] over an optional `[from, to]` date window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any of the aggregate queries fail.
pub async fn project_metrics(
    pool: &PgPool,
    project_id: Uuid,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<ProjectMetrics, DbError> {
    const WINDOW: &str = "project_id = $1 \
         AND ($2::timestamptz IS NULL OR COALESCE(published_at, ingested_at) >= $2) \
         AND ($3::timestamptz IS NULL OR COALESCE(published_at, ingested_at) <= $3)";

    let total_mentions: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM mentions WHERE {WINDOW}"))
            .bind(project_id)
            .bind(from)
            .bind(to)
            .fetch_one(pool)
            .await?;

    let volume = sqlx::query_as::<_, DailyCount>(&format!(
        "SELECT (COALESCE(published_at, ingested_at) AT TIME ZONE 'UTC')::date AS day, \
                COUNT(*) AS count \
         FROM mentions WHERE {WINDOW} \
         GROUP BY day ORDER BY day"
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let sentiment_share = sqlx::query_as::<_, LabelCount>(&format!(
        "SELECT sentiment_label AS label, COUNT(*) AS count \
         FROM mentions WHERE {WINDOW} \
         GROUP BY sentiment_label ORDER BY count DESC, label"
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let top_sources = sqlx::query_as::<_, LabelCount>(&format!(
        "SELECT source AS label, COUNT(*) AS count \
         FROM mentions WHERE {WINDOW} \
         GROUP BY source ORDER BY count DESC, label LIMIT $4"
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .bind(TOP_N)
    .fetch_all(pool)
    .await?;

    let top_authors = sqlx::query_as::<_, LabelCount>(&format!(
        "SELECT author AS label, COUNT(*) AS count \
         FROM mentions WHERE {WINDOW} AND author <> '' \
         GROUP BY author ORDER BY count DESC, label LIMIT $4"
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .bind(TOP_N)
    .fetch_all(pool)
    .await?;

    Ok(ProjectMetrics {
        total_mentions,
        volume,
        sentiment_share,
        top_sources,
        top_authors,
    })
}
