//! Database operations for the `monthly_usage` ledger.

use chrono::{DateTime, Utc};
use mwatch_core::Usage;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `monthly_usage` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageRow {
    pub account_id: Uuid,
    pub month: String,
    pub mentions_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UsageRow> for Usage {
    fn from(row: UsageRow) -> Self {
        Self {
            account_id: row.account_id,
            month: row.month,
            mentions_count: row.mentions_count,
        }
    }
}

/// Return the usage record for `(account_id, month)`, creating a zero-count
/// record first if none exists. Concurrent first writers converge on the same
/// row because the insert is `ON CONFLICT DO NOTHING`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn ensure_usage(pool: &PgPool, account_id: Uuid, month: &str) -> Result<Usage, DbError> {
    sqlx::query(
        "INSERT INTO monthly_usage (account_id, month, mentions_count) \
         VALUES ($1, $2, 0) \
         ON CONFLICT (account_id, month) DO NOTHING",
    )
    .bind(account_id)
    .bind(month)
    .execute(pool)
    .await?;

    get_usage(pool, account_id, month)
        .await?
        .ok_or(DbError::NotFound)
}

/// Fetch the usage record for `(account_id, month)` without creating it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_usage(
    pool: &PgPool,
    account_id: Uuid,
    month: &str,
) -> Result<Option<Usage>, DbError> {
    let row = sqlx::query_as::<_, UsageRow>(
        "SELECT account_id, month, mentions_count, created_at, updated_at \
         FROM monthly_usage \
         WHERE account_id = $1 AND month = $2",
    )
    .bind(account_id)
    .bind(month)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Usage::from))
}

/// Atomically add `by` to the month's counter, creating the record if needed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn increment_usage(
    pool: &PgPool,
    account_id: Uuid,
    month: &str,
    by: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO monthly_usage (account_id, month, mentions_count) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (account_id, month) DO UPDATE SET \
             mentions_count = monthly_usage.mentions_count + EXCLUDED.mentions_count, \
             updated_at     = NOW()",
    )
    .bind(account_id)
    .bind(month)
    .bind(by)
    .execute(pool)
    .await?;

    Ok(())
}
