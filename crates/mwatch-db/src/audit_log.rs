//! Database operations for the `audit_log` table.

use chrono::{DateTime, Utc};
use mwatch_core::AuditEntry;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `audit_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub account_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub connector_id: String,
    pub level: String,
    pub message: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Append one audit entry and return its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_audit_entry(pool: &PgPool, entry: &AuditEntry) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO audit_log \
             (account_id, project_id, connector_id, level, message, metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(entry.account_id)
    .bind(entry.project_id)
    .bind(&entry.connector_id)
    .bind(entry.level.as_str())
    .bind(&entry.message)
    .bind(&entry.metadata)
    .bind(entry.created_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent audit entries for a project.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_audit_entries(
    pool: &PgPool,
    project_id: Uuid,
    limit: i64,
) -> Result<Vec<AuditLogRow>, DbError> {
    let rows = sqlx::query_as::<_, AuditLogRow>(
        "SELECT id, account_id, project_id, connector_id, level, message, metadata, created_at \
         FROM audit_log \
         WHERE project_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
