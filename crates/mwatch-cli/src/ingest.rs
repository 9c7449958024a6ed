//! One-off ingestion passes and scheduler ticks.

use chrono::Utc;
use mwatch_engine::{build_engine, IngestOptions, Scheduler, SchedulerConfig};
use uuid::Uuid;

/// Run one pass for `project_id` and print the outcome as JSON.
///
/// # Errors
///
/// Returns an error if the project does not exist, the engine cannot be
/// built, or the pass fails to persist its mentions.
pub(crate) async fn run_ingest(
    config: &mwatch_core::AppConfig,
    pool: &sqlx::PgPool,
    project_id: Uuid,
    force: bool,
    auto_pause: bool,
) -> anyhow::Result<()> {
    let project = match mwatch_db::get_project(pool, project_id).await {
        Ok(p) => p,
        Err(mwatch_db::DbError::NotFound) => anyhow::bail!("project {project_id} not found"),
        Err(e) => return Err(e.into()),
    };

    let engine = build_engine(config, pool.clone())?;
    let outcome = engine
        .orchestrator
        .ingest_project(&project, IngestOptions { force, auto_pause })
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Run a single scheduler tick over every due project.
///
/// # Errors
///
/// Returns an error if the engine cannot be built or active projects cannot
/// be listed.
pub(crate) async fn run_tick(
    config: &mwatch_core::AppConfig,
    pool: &sqlx::PgPool,
) -> anyhow::Result<()> {
    let engine = build_engine(config, pool.clone())?;
    let scheduler = Scheduler::new(engine.orchestrator, SchedulerConfig::from_app_config(config));
    let summary = scheduler.run_tick(Utc::now()).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
