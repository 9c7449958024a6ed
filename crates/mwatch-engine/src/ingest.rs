//! One project's ingestion pass.
//!
//! Connectors run one at a time, each under a fixed timeout. A failing or
//! slow connector is recorded as that connector's failure and the pass moves
//! on. Surviving candidates are filtered, enriched and inserted per
//! connector; duplicates are absorbed by the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mwatch_core::{
    month_key, plan_limits, AlertType, AuditEntry, AuditLevel, HealthStatus, Mention, NewMention,
    Project, ProjectStatus, RawMention,
};
use mwatch_sources::{Connector, ConnectorRegistry, TextClassifier};
use serde::Serialize;
use serde_json::json;

use crate::alerts::AlertEngine;
use crate::error::EngineError;
use crate::fingerprint::fingerprint;
use crate::health::{self, Attempt};
use crate::query;
use crate::quota::{is_over_limit, QuotaLedger};
use crate::reach::ReachEstimator;
use crate::store::IngestStore;

pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Run even if the project is paused.
    pub force: bool,
    /// Leave the project paused once the pass finishes.
    pub auto_pause: bool,
}

/// Result of one connector call, with errors kept as values so they never
/// cross into the pass.
#[derive(Debug)]
pub enum ConnectorOutcome {
    Fetched(Vec<RawMention>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The account's monthly quota is used up, or the account is gone.
    Limit,
}

/// Per-connector line of a pass report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorReport {
    pub connector: &'static str,
    pub status: HealthStatus,
    pub fetched: usize,
    pub matched: usize,
    pub inserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{inserted, status}` for a pass that ran or was skipped for its status,
/// `{inserted: 0, reason}` for one refused up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub inserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connectors: Vec<ConnectorReport>,
}

impl IngestOutcome {
    fn skipped(status: ProjectStatus) -> Self {
        Self {
            inserted: 0,
            status: Some(status),
            reason: None,
            connectors: Vec::new(),
        }
    }

    fn refused(reason: SkipReason) -> Self {
        Self {
            inserted: 0,
            status: None,
            reason: Some(reason),
            connectors: Vec::new(),
        }
    }
}

/// First project keyword contained in `text`, compared case-insensitively.
fn matched_keyword(keywords: &[String], text: &str) -> Option<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .find(|k| haystack.contains(&k.to_lowercase()))
        .cloned()
}

/// Whether `text` is relevant to `project`, and the keyword that matched.
///
/// The boolean query must pass, and a project with keywords additionally
/// needs a literal keyword hit.
#[must_use]
pub fn relevance(project: &Project, text: &str) -> Option<String> {
    if !query::matches(&project.boolean_query, text) {
        return None;
    }
    match matched_keyword(&project.keywords, text) {
        Some(keyword) => Some(keyword),
        None if project.keywords.is_empty() => Some(String::new()),
        None => None,
    }
}

pub struct IngestionOrchestrator {
    store: Arc<dyn IngestStore>,
    registry: ConnectorRegistry,
    classifier: Arc<dyn TextClassifier>,
    alerts: Arc<AlertEngine>,
    reach: ReachEstimator,
    connector_timeout: Duration,
}

impl IngestionOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn IngestStore>,
        registry: ConnectorRegistry,
        classifier: Arc<dyn TextClassifier>,
        alerts: Arc<AlertEngine>,
    ) -> Self {
        Self {
            store,
            registry,
            classifier,
            alerts,
            reach: ReachEstimator::default(),
            connector_timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_connector_timeout(mut self, timeout: Duration) -> Self {
        self.connector_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reach_estimator(mut self, reach: ReachEstimator) -> Self {
        self.reach = reach;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn IngestStore> {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Run one ingestion pass for `project`.
    ///
    /// # Errors
    ///
    /// Returns an error only for persistence failures. Connector failures
    /// are recorded in health and the audit log instead.
    pub async fn ingest_project(
        &self,
        project: &Project,
        options: IngestOptions,
    ) -> Result<IngestOutcome, EngineError> {
        if project.status != ProjectStatus::Active && !options.force {
            tracing::debug!(project = %project.id, status = %project.status, "project not active, skipping");
            return Ok(IngestOutcome::skipped(project.status));
        }

        let run_at = Utc::now();
        let month = month_key(run_at);
        let ledger = QuotaLedger::new(self.store.as_ref());

        let Some(account) = self.store.get_account(project.account_id).await? else {
            tracing::warn!(project = %project.id, account = %project.account_id, "owning account not found");
            return Ok(IngestOutcome::refused(SkipReason::Limit));
        };
        let usage = ledger.ensure(account.id, &month).await?;
        if is_over_limit(&plan_limits(&account.plan), &usage) {
            tracing::info!(
                project = %project.id,
                plan = %account.plan,
                used = usage.mentions_count,
                "monthly mention quota reached"
            );
            return Ok(IngestOutcome::refused(SkipReason::Limit));
        }

        let final_status = if options.auto_pause {
            ProjectStatus::Paused
        } else {
            project.status
        };

        let (reports, inserted) = match self.run_connectors(project, run_at).await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(project = %project.id, error = %e, "ingestion pass aborted");
                self.stamp_best_effort(project, run_at, final_status).await;
                return Err(e);
            }
        };

        if !inserted.is_empty() {
            let count = inserted.len();
            if let Err(e) = ledger
                .record(project.account_id, &month, i64::try_from(count).unwrap_or(i64::MAX))
                .await
            {
                tracing::error!(project = %project.id, error = %e, "usage increment failed");
                self.stamp_best_effort(project, run_at, final_status).await;
                return Err(e);
            }
            self.raise_alerts(project, &inserted, run_at).await;
        }

        self.store
            .finish_project_run(project.id, run_at, final_status)
            .await?;

        tracing::info!(
            project = %project.id,
            inserted = inserted.len(),
            connectors = reports.len(),
            "ingestion pass complete"
        );

        Ok(IngestOutcome {
            inserted: inserted.len(),
            status: Some(final_status),
            reason: None,
            connectors: reports,
        })
    }

    async fn run_connectors(
        &self,
        project: &Project,
        run_at: DateTime<Utc>,
    ) -> Result<(Vec<ConnectorReport>, Vec<Mention>), EngineError> {
        let mut reports = Vec::new();
        let mut inserted = Vec::new();

        for connector in self.registry.enabled_for(project) {
            let id = connector.id();
            let report = match self.fetch(connector.as_ref(), project).await {
                ConnectorOutcome::Fetched(raw) => {
                    let fetched = raw.len();
                    let prepared = self.prepare(project, raw, run_at).await;
                    let persisted = self.store.insert_mentions(&prepared).await?;
                    let attempt = Attempt::Completed {
                        persisted: persisted.len(),
                    };
                    self.store
                        .upsert_connector_health(&health::assess(project.id, id, attempt, run_at))
                        .await?;
                    tracing::debug!(
                        project = %project.id,
                        connector = id,
                        fetched,
                        matched = prepared.len(),
                        inserted = persisted.len(),
                        "connector done"
                    );
                    let report = ConnectorReport {
                        connector: id,
                        status: health::status_for(attempt),
                        fetched,
                        matched: prepared.len(),
                        inserted: persisted.len(),
                        error: None,
                    };
                    inserted.extend(persisted);
                    report
                }
                ConnectorOutcome::Failed(error) => {
                    tracing::warn!(project = %project.id, connector = id, error = %error, "connector failed");
                    let attempt = Attempt::Failed { error: &error };
                    self.store
                        .upsert_connector_health(&health::assess(project.id, id, attempt, run_at))
                        .await?;
                    self.store
                        .insert_audit_entry(&AuditEntry {
                            account_id: project.account_id,
                            project_id: project.id,
                            connector_id: id.to_string(),
                            level: AuditLevel::Error,
                            message: error.clone(),
                            metadata: json!({}),
                            created_at: run_at,
                        })
                        .await?;
                    ConnectorReport {
                        connector: id,
                        status: HealthStatus::Degraded,
                        fetched: 0,
                        matched: 0,
                        inserted: 0,
                        error: Some(error),
                    }
                }
            };
            reports.push(report);
        }

        Ok((reports, inserted))
    }

    async fn fetch(&self, connector: &dyn Connector, project: &Project) -> ConnectorOutcome {
        match tokio::time::timeout(
            self.connector_timeout,
            connector.fetch(project, project.last_run_at),
        )
        .await
        {
            Ok(Ok(raw)) => ConnectorOutcome::Fetched(raw),
            Ok(Err(e)) => ConnectorOutcome::Failed(e.to_string()),
            Err(_) => ConnectorOutcome::Failed(format!(
                "timed out after {}s",
                self.connector_timeout.as_secs_f32()
            )),
        }
    }

    /// Filter candidates for relevance and enrich the survivors.
    async fn prepare(
        &self,
        project: &Project,
        raw: Vec<RawMention>,
        run_at: DateTime<Utc>,
    ) -> Vec<NewMention> {
        let mut prepared = Vec::new();
        for candidate in raw {
            let text = candidate.combined_text();
            let Some(keyword_matched) = relevance(project, &text) else {
                continue;
            };
            let sentiment = self.classifier.classify(&text).await;
            prepared.push(NewMention {
                project_id: project.id,
                keyword_matched,
                lang: self.classifier.language(&text),
                reach_estimate: self.reach.estimate(&candidate),
                similarity_hash: fingerprint(&text),
                geo: project.geo_focus.clone(),
                sentiment,
                ingested_at: run_at,
                source: candidate.source,
                title: candidate.title,
                text: candidate.text,
                author: candidate.author,
                url: candidate.url,
                published_at: candidate.published_at,
                engagement: candidate.engagement,
                follower_count: candidate.follower_count,
            });
        }
        prepared
    }

    async fn raise_alerts(&self, project: &Project, inserted: &[Mention], run_at: DateTime<Utc>) {
        let count = inserted.len();
        if let Err(e) = self
            .alerts
            .create_alert(
                project,
                AlertType::NewMentions,
                format!("{count} new mentions for {}.", project.name),
                json!({ "count": count }),
                inserted,
                run_at,
            )
            .await
        {
            tracing::error!(project = %project.id, error = %e, "new mentions alert failed");
        }

        let checked_at = Utc::now();
        self.alerts.run_all_checks(project, checked_at).await;
        self.alerts
            .check_influencers(project, inserted, checked_at)
            .await;
    }

    async fn stamp_best_effort(&self, project: &Project, run_at: DateTime<Utc>, status: ProjectStatus) {
        if let Err(e) = self
            .store
            .finish_project_run(project.id, run_at, status)
            .await
        {
            tracing::error!(project = %project.id, error = %e, "could not stamp last run");
        }
    }
}
