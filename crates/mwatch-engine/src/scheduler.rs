//! The recurring tick: find due projects and run their passes.
//!
//! Due-ness is re-read from the store on every tick. Before a pass starts,
//! the project is claimed by a conditional `last_run_at` stamp, so a project
//! still mid-pass (or already taken by another scheduler) is skipped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use mwatch_core::{AppConfig, Project};
use serde::Serialize;

use crate::error::EngineError;
use crate::ingest::{IngestOptions, IngestionOrchestrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_concurrent_projects: usize,
    pub auto_pause: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_projects: 4,
            auto_pause: false,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_projects: config.scheduler_max_concurrent_projects.max(1),
            auto_pause: config.scheduler_auto_pause,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub active: usize,
    pub due: usize,
    pub ran: usize,
    /// Due projects whose claim was lost to another pass.
    pub contended: usize,
    pub failed: usize,
    pub inserted: usize,
}

enum PassResult {
    Ran(usize),
    Contended,
    Failed,
}

pub struct Scheduler {
    orchestrator: Arc<IngestionOrchestrator>,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(orchestrator: Arc<IngestionOrchestrator>, config: SchedulerConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Run every project that is due at `now`, at most
    /// `max_concurrent_projects` at a time.
    ///
    /// # Errors
    ///
    /// Returns an error only if the active projects cannot be listed.
    /// Failing passes are counted, not returned.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickSummary, EngineError> {
        let projects = self.orchestrator.store().list_active_projects().await?;
        let active = projects.len();
        let due: Vec<Project> = projects.into_iter().filter(|p| p.is_due(now)).collect();

        let mut summary = TickSummary {
            active,
            due: due.len(),
            ..TickSummary::default()
        };
        if due.is_empty() {
            tracing::debug!(active, "no projects due");
            return Ok(summary);
        }

        let results: Vec<PassResult> = stream::iter(due)
            .map(|project| self.run_one(project, now))
            .buffer_unordered(self.config.max_concurrent_projects.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                PassResult::Ran(inserted) => {
                    summary.ran += 1;
                    summary.inserted += inserted;
                }
                PassResult::Contended => summary.contended += 1,
                PassResult::Failed => summary.failed += 1,
            }
        }

        tracing::info!(
            active = summary.active,
            due = summary.due,
            ran = summary.ran,
            contended = summary.contended,
            failed = summary.failed,
            inserted = summary.inserted,
            "scheduler tick complete"
        );
        Ok(summary)
    }

    async fn run_one(&self, project: Project, now: DateTime<Utc>) -> PassResult {
        match self
            .orchestrator
            .store()
            .claim_project_run(project.id, now)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(project = %project.id, "project already claimed, skipping");
                return PassResult::Contended;
            }
            Err(e) => {
                tracing::error!(project = %project.id, error = %e, "claim failed");
                return PassResult::Failed;
            }
        }

        let options = IngestOptions {
            force: false,
            auto_pause: self.config.auto_pause,
        };
        match self.orchestrator.ingest_project(&project, options).await {
            Ok(outcome) => PassResult::Ran(outcome.inserted),
            Err(e) => {
                tracing::error!(project = %project.id, error = %e, "scheduled pass failed");
                PassResult::Failed
            }
        }
    }
}
