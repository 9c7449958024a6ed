//! Persistence seam for the engine.
//!
//! The orchestrator, alert engine and scheduler only see [`IngestStore`].
//! [`PgStore`] forwards to `mwatch-db`; `MemoryStore` backs the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{
    Account, Alert, AlertType, AuditEntry, ConnectorHealth, Mention, NewAlert, NewMention,
    Project, ProjectStatus, Usage,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EngineError;

#[async_trait]
pub trait IngestStore: Send + Sync {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, EngineError>;

    async fn list_active_projects(&self) -> Result<Vec<Project>, EngineError>;

    /// Stamp `last_run_at = now` if the project is still active and due.
    /// `false` means another pass holds it.
    async fn claim_project_run(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, EngineError>;

    async fn finish_project_run(
        &self,
        id: Uuid,
        last_run_at: DateTime<Utc>,
        status: ProjectStatus,
    ) -> Result<(), EngineError>;

    /// Return the month's usage, creating a zero record if absent.
    async fn ensure_usage(&self, account_id: Uuid, month: &str) -> Result<Usage, EngineError>;

    async fn increment_usage(
        &self,
        account_id: Uuid,
        month: &str,
        by: i64,
    ) -> Result<(), EngineError>;

    /// Insert a batch, skipping rows that collide with an existing
    /// `(project, source, url)` or `(project, similarity_hash)`. Returns the
    /// rows actually inserted.
    async fn insert_mentions(&self, mentions: &[NewMention]) -> Result<Vec<Mention>, EngineError>;

    async fn count_mentions_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, EngineError>;

    /// Mentions ingested in `[from, to)`, newest first.
    async fn list_mentions_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<Mention>, EngineError>;

    async fn sum_reach_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, EngineError>;

    async fn upsert_connector_health(&self, health: &ConnectorHealth) -> Result<(), EngineError>;

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), EngineError>;

    async fn has_recent_alert(
        &self,
        account_id: Uuid,
        project_id: Uuid,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<bool, EngineError>;

    async fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, EngineError>;
}

/// [`IngestStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn not_found(entity: &'static str, id: Uuid) -> impl FnOnce(mwatch_db::DbError) -> EngineError {
    move |e| match e {
        mwatch_db::DbError::NotFound => EngineError::NotFound { entity, id },
        other => EngineError::Db(other),
    }
}

#[async_trait]
impl IngestStore for PgStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, EngineError> {
        let row = mwatch_db::get_account(&self.pool, id).await?;
        Ok(row.map(Account::from))
    }

    async fn list_active_projects(&self) -> Result<Vec<Project>, EngineError> {
        Ok(mwatch_db::list_active_projects(&self.pool).await?)
    }

    async fn claim_project_run(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, EngineError> {
        Ok(mwatch_db::claim_project_run(&self.pool, id, now).await?)
    }

    async fn finish_project_run(
        &self,
        id: Uuid,
        last_run_at: DateTime<Utc>,
        status: ProjectStatus,
    ) -> Result<(), EngineError> {
        mwatch_db::finish_project_run(&self.pool, id, last_run_at, status)
            .await
            .map_err(not_found("project", id))
    }

    async fn ensure_usage(&self, account_id: Uuid, month: &str) -> Result<Usage, EngineError> {
        Ok(mwatch_db::ensure_usage(&self.pool, account_id, month).await?)
    }

    async fn increment_usage(
        &self,
        account_id: Uuid,
        month: &str,
        by: i64,
    ) -> Result<(), EngineError> {
        Ok(mwatch_db::increment_usage(&self.pool, account_id, month, by).await?)
    }

    async fn insert_mentions(&self, mentions: &[NewMention]) -> Result<Vec<Mention>, EngineError> {
        Ok(mwatch_db::insert_mentions(&self.pool, mentions).await?)
    }

    async fn count_mentions_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        Ok(mwatch_db::count_mentions_between(&self.pool, project_id, from, to).await?)
    }

    async fn list_mentions_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<Mention>, EngineError> {
        Ok(mwatch_db::list_mentions_between(&self.pool, project_id, from, to, limit).await?)
    }

    async fn sum_reach_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        Ok(mwatch_db::sum_reach_between(&self.pool, project_id, from, to).await?)
    }

    async fn upsert_connector_health(&self, health: &ConnectorHealth) -> Result<(), EngineError> {
        Ok(mwatch_db::upsert_connector_health(&self.pool, health).await?)
    }

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), EngineError> {
        mwatch_db::insert_audit_entry(&self.pool, entry).await?;
        Ok(())
    }

    async fn has_recent_alert(
        &self,
        account_id: Uuid,
        project_id: Uuid,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        Ok(
            mwatch_db::has_recent_alert(&self.pool, account_id, project_id, alert_type, since)
                .await?,
        )
    }

    async fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, EngineError> {
        Ok(mwatch_db::insert_alert(&self.pool, alert).await?)
    }
}
