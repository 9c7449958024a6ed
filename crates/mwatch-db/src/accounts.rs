//! Database operations for the `accounts` table.
//!
//! Accounts are mastered by the external account service; this table mirrors
//! the fields ingestion needs (plan and alert-email preference).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: String,
    pub email_alerts_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for mwatch_core::Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            plan: row.plan,
            email_alerts_enabled: row.email_alerts_enabled,
        }
    }
}

/// Fetch one account, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_account(pool: &PgPool, id: Uuid) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, email, full_name, plan, email_alerts_enabled, created_at \
         FROM accounts \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or refresh the mirrored account fields.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_account(
    pool: &PgPool,
    account: &mwatch_core::Account,
) -> Result<AccountRow, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        "INSERT INTO accounts (id, email, full_name, plan, email_alerts_enabled) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (id) DO UPDATE SET \
             email                = EXCLUDED.email, \
             full_name            = EXCLUDED.full_name, \
             plan                 = EXCLUDED.plan, \
             email_alerts_enabled = EXCLUDED.email_alerts_enabled \
         RETURNING id, email, full_name, plan, email_alerts_enabled, created_at",
    )
    .bind(account.id)
    .bind(&account.email)
    .bind(&account.full_name)
    .bind(&account.plan)
    .bind(account.email_alerts_enabled)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
