//! Background job scheduler.
//!
//! Registers the ingestion tick with a [`JobScheduler`]. Each firing runs
//! [`Scheduler::run_tick`]; overlapping firings are safe because every pass
//! claims its project before it starts.

use std::sync::Arc;

use chrono::Utc;
use mwatch_engine::Scheduler;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    tick: Arc<Scheduler>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_ingest_tick(&scheduler, tick, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_ingest_tick(
    scheduler: &JobScheduler,
    tick: Arc<Scheduler>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let tick = Arc::clone(&tick);

        Box::pin(async move {
            if let Err(e) = tick.run_tick(Utc::now()).await {
                tracing::error!(error = %e, "scheduler: ingestion tick failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered ingestion tick");
    Ok(())
}
