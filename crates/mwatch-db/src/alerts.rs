//! Database operations for the `alerts` table.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use mwatch_core::{Alert, AlertType, NewAlert};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ALERT_COLUMNS: &str =
    "id, account_id, project_id, alert_type, message, payload, created_at, read_at";

/// A row from the `alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub project_id: Uuid,
    pub alert_type: String,
    pub message: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = DbError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let alert_type = row
            .alert_type
            .parse::<AlertType>()
            .map_err(|e| DbError::decode("alerts.alert_type", e))?;
        Ok(Self {
            id: row.id,
            account_id: row.account_id,
            project_id: row.project_id,
            alert_type,
            message: row.message,
            payload: row.payload,
            created_at: row.created_at,
            read_at: row.read_at,
        })
    }
}

/// Alert counts for one account, as shown on the dashboard badge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertStats {
    pub today: i64,
    pub this_week: i64,
    pub unread: i64,
    pub by_type: BTreeMap<String, i64>,
}

/// Persist a new alert and return it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_alert(pool: &PgPool, alert: &NewAlert) -> Result<Alert, DbError> {
    let row = sqlx::query_as::<_, AlertRow>(&format!(
        "INSERT INTO alerts (id, account_id, project_id, alert_type, message, payload, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {ALERT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(alert.account_id)
    .bind(alert.project_id)
    .bind(alert.alert_type.as_str())
    .bind(&alert.message)
    .bind(&alert.payload)
    .bind(alert.created_at)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Whether an alert of this type exists for the project at or after `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn has_recent_alert(
    pool: &PgPool,
    account_id: Uuid,
    project_id: Uuid,
    alert_type: AlertType,
    since: DateTime<Utc>,
) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS ( \
             SELECT 1 FROM alerts \
             WHERE account_id = $1 AND project_id = $2 AND alert_type = $3 \
               AND created_at >= $4)",
    )
    .bind(account_id)
    .bind(project_id)
    .bind(alert_type.as_str())
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// List an account's alerts, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_alerts(
    pool: &PgPool,
    account_id: Uuid,
    project_id: Option<Uuid>,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<Alert>, DbError> {
    let rows = sqlx::query_as::<_, AlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts \
         WHERE account_id = $1 \
           AND ($2::uuid IS NULL OR project_id = $2) \
           AND (NOT $3 OR read_at IS NULL) \
         ORDER BY created_at DESC, id \
         LIMIT $4"
    ))
    .bind(account_id)
    .bind(project_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Alert::try_from).collect()
}

/// Set `read_at` on an alert that has not been read yet.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the alert does not exist or is already read.
pub async fn mark_alert_read(pool: &PgPool, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE alerts SET read_at = $2 WHERE id = $1 AND read_at IS NULL")
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Alert counts for the last 24 hours, the last 7 days, unread, and per type
/// over the last 7 days.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn alert_stats(
    pool: &PgPool,
    account_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AlertStats, DbError> {
    let day_ago = now - Duration::days(1);
    let week_ago = now - Duration::days(7);

    let (today, this_week, unread): (i64, i64, i64) = sqlx::query_as(
        "SELECT \
             COUNT(*) FILTER (WHERE created_at >= $2), \
             COUNT(*) FILTER (WHERE created_at >= $3), \
             COUNT(*) FILTER (WHERE read_at IS NULL) \
         FROM alerts \
         WHERE account_id = $1",
    )
    .bind(account_id)
    .bind(day_ago)
    .bind(week_ago)
    .fetch_one(pool)
    .await?;

    let by_type: Vec<(String, i64)> = sqlx::query_as(
        "SELECT alert_type, COUNT(*) FROM alerts \
         WHERE account_id = $1 AND created_at >= $2 \
         GROUP BY alert_type",
    )
    .bind(account_id)
    .bind(week_ago)
    .fetch_all(pool)
    .await?;

    Ok(AlertStats {
        today,
        this_week,
        unread,
        by_type: by_type.into_iter().collect(),
    })
}
