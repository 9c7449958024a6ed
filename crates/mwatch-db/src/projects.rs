//! Database operations for the `projects` table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mwatch_core::{Project, ProjectStatus};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::DbError;

const PROJECT_COLUMNS: &str = "id, account_id, name, keywords, boolean_query, sources, \
     schedule_minutes, geo_focus, status, last_run_at, created_at, updated_at";

/// A row from the `projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub boolean_query: String,
    pub sources: Json<BTreeMap<String, bool>>,
    pub schedule_minutes: i32,
    pub geo_focus: String,
    pub status: String,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = DbError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ProjectStatus>()
            .map_err(|e| DbError::decode("projects.status", e))?;

        Ok(Self {
            id: row.id,
            account_id: row.account_id,
            name: row.name,
            keywords: row.keywords,
            boolean_query: row.boolean_query,
            sources: row.sources.0,
            schedule_minutes: row.schedule_minutes,
            geo_focus: row.geo_focus,
            status,
            last_run_at: row.last_run_at,
        })
    }
}

/// Fields required to create a project. Keywords are expected to be
/// normalized already (see [`mwatch_core::validate_project_settings`]).
#[derive(Debug, Clone)]
pub struct NewProject {
    pub account_id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub boolean_query: String,
    pub sources: BTreeMap<String, bool>,
    pub schedule_minutes: i32,
    pub geo_focus: String,
}

/// Insert a new active project and return it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate
/// `(account_id, name)`).
pub async fn create_project(pool: &PgPool, project: &NewProject) -> Result<Project, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "INSERT INTO projects \
             (id, account_id, name, keywords, boolean_query, sources, schedule_minutes, geo_focus) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(project.account_id)
    .bind(&project.name)
    .bind(&project.keywords)
    .bind(&project.boolean_query)
    .bind(Json(&project.sources))
    .bind(project.schedule_minutes)
    .bind(&project.geo_focus)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Fetch a project by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no project has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Project, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.try_into()
}

/// List every project with `status = 'active'`, oldest run first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_projects(pool: &PgPool) -> Result<Vec<Project>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects \
         WHERE status = 'active' \
         ORDER BY last_run_at ASC NULLS FIRST, id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Project::try_from).collect()
}

/// List projects, optionally restricted to one account.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_projects(
    pool: &PgPool,
    account_id: Option<Uuid>,
) -> Result<Vec<Project>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects \
         WHERE ($1::uuid IS NULL OR account_id = $1) \
         ORDER BY created_at, id"
    ))
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Project::try_from).collect()
}

/// Delete a project. Mentions, alerts, connector health and audit rows are
/// removed by `ON DELETE CASCADE`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no project has this id.
pub async fn delete_project(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stamp `last_run_at = now` if the project is still active and still due.
///
/// Returns `false` when another pass already claimed the project (or it was
/// paused) since the caller last read it. The due check runs inside the
/// `UPDATE`, so two schedulers racing on one project cannot both win.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_project_run(
    pool: &PgPool,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE projects \
         SET last_run_at = $2, updated_at = NOW() \
         WHERE id = $1 \
           AND status = 'active' \
           AND (last_run_at IS NULL \
                OR last_run_at <= $2 - make_interval(mins => schedule_minutes))",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record the end of a pass: stamp `last_run_at` and write the final status.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the project no longer exists.
pub async fn finish_project_run(
    pool: &PgPool,
    id: Uuid,
    last_run_at: DateTime<Utc>,
    status: ProjectStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE projects \
         SET last_run_at = $2, status = $3, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(last_run_at)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
