//! Database operations for the `connector_health` table.

use chrono::{DateTime, Utc};
use mwatch_core::{ConnectorHealth, HealthStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `connector_health` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectorHealthRow {
    pub project_id: Uuid,
    pub connector_id: String,
    pub status: String,
    pub last_error: String,
    pub last_checked_at: DateTime<Utc>,
}

impl TryFrom<ConnectorHealthRow> for ConnectorHealth {
    type Error = DbError;

    fn try_from(row: ConnectorHealthRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<HealthStatus>()
            .map_err(|e| DbError::decode("connector_health.status", e))?;
        Ok(Self {
            project_id: row.project_id,
            connector_id: row.connector_id,
            status,
            last_error: row.last_error,
            last_checked_at: row.last_checked_at,
        })
    }
}

/// Overwrite the health record for `(project_id, connector_id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_connector_health(
    pool: &PgPool,
    health: &ConnectorHealth,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO connector_health \
             (project_id, connector_id, status, last_error, last_checked_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (project_id, connector_id) DO UPDATE SET \
             status          = EXCLUDED.status, \
             last_error      = EXCLUDED.last_error, \
             last_checked_at = EXCLUDED.last_checked_at",
    )
    .bind(health.project_id)
    .bind(&health.connector_id)
    .bind(health.status.as_str())
    .bind(&health.last_error)
    .bind(health.last_checked_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// All health records for a project, ordered by connector id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_connector_health(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ConnectorHealth>, DbError> {
    let rows = sqlx::query_as::<_, ConnectorHealthRow>(
        "SELECT project_id, connector_id, status, last_error, last_checked_at \
         FROM connector_health \
         WHERE project_id = $1 \
         ORDER BY connector_id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ConnectorHealth::try_from).collect()
}
