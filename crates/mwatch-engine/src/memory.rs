//! In-process [`IngestStore`] with the same uniqueness rules as the schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{
    Account, Alert, AlertType, AuditEntry, ConnectorHealth, Mention, NewAlert, NewMention,
    Project, ProjectStatus, Usage,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::IngestStore;

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    projects: HashMap<Uuid, Project>,
    mentions: Vec<Mention>,
    health: HashMap<(Uuid, String), ConnectorHealth>,
    usage: HashMap<(Uuid, String), Usage>,
    alerts: Vec<Alert>,
    audit: Vec<AuditEntry>,
    fail_inserts: bool,
}

impl State {
    fn collides(&self, candidate: &NewMention) -> bool {
        self.mentions.iter().any(|m| {
            m.project_id == candidate.project_id
                && ((candidate.url.is_some() && m.source == candidate.source && m.url == candidate.url)
                    || (candidate.similarity_hash.is_some()
                        && m.similarity_hash == candidate.similarity_hash))
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    pub async fn add_project(&self, project: Project) {
        self.state.lock().await.projects.insert(project.id, project);
    }

    pub async fn project(&self, id: Uuid) -> Option<Project> {
        self.state.lock().await.projects.get(&id).cloned()
    }

    /// Insert mentions verbatim, bypassing dedup. Used to seed history.
    pub async fn seed_mentions(&self, mentions: Vec<Mention>) {
        self.state.lock().await.mentions.extend(mentions);
    }

    pub async fn mentions(&self) -> Vec<Mention> {
        self.state.lock().await.mentions.clone()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.state.lock().await.alerts.clone()
    }

    /// Seed a past alert, e.g. to exercise cooldowns.
    pub async fn seed_alert(&self, alert: Alert) {
        self.state.lock().await.alerts.push(alert);
    }

    pub async fn health(&self, project_id: Uuid, connector_id: &str) -> Option<ConnectorHealth> {
        self.state
            .lock()
            .await
            .health
            .get(&(project_id, connector_id.to_string()))
            .cloned()
    }

    pub async fn health_records(&self) -> Vec<ConnectorHealth> {
        self.state.lock().await.health.values().cloned().collect()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }

    pub async fn usage(&self, account_id: Uuid, month: &str) -> Option<Usage> {
        self.state
            .lock()
            .await
            .usage
            .get(&(account_id, month.to_string()))
            .cloned()
    }

    pub async fn set_usage(&self, account_id: Uuid, month: &str, mentions_count: i64) {
        self.state.lock().await.usage.insert(
            (account_id, month.to_string()),
            Usage {
                account_id,
                month: month.to_string(),
                mentions_count,
            },
        );
    }

    /// Make every subsequent mention insert fail as if the database were gone.
    pub async fn set_fail_inserts(&self, fail: bool) {
        self.state.lock().await.fail_inserts = fail;
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, EngineError> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn list_active_projects(&self) -> Result<Vec<Project>, EngineError> {
        let state = self.state.lock().await;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| p.status == ProjectStatus::Active)
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn claim_project_run(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(false);
        };
        if project.status != ProjectStatus::Active || !project.is_due(now) {
            return Ok(false);
        }
        project.last_run_at = Some(now);
        Ok(true)
    }

    async fn finish_project_run(
        &self,
        id: Uuid,
        last_run_at: DateTime<Utc>,
        status: ProjectStatus,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let project = state.projects.get_mut(&id).ok_or(EngineError::NotFound {
            entity: "project",
            id,
        })?;
        project.last_run_at = Some(last_run_at);
        project.status = status;
        Ok(())
    }

    async fn ensure_usage(&self, account_id: Uuid, month: &str) -> Result<Usage, EngineError> {
        let mut state = self.state.lock().await;
        // monthly_usage.account_id references accounts(id).
        if !state.accounts.contains_key(&account_id) {
            return Err(EngineError::NotFound {
                entity: "account",
                id: account_id,
            });
        }
        let usage = state
            .usage
            .entry((account_id, month.to_string()))
            .or_insert_with(|| Usage {
                account_id,
                month: month.to_string(),
                mentions_count: 0,
            });
        Ok(usage.clone())
    }

    async fn increment_usage(
        &self,
        account_id: Uuid,
        month: &str,
        by: i64,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        state
            .usage
            .entry((account_id, month.to_string()))
            .or_insert_with(|| Usage {
                account_id,
                month: month.to_string(),
                mentions_count: 0,
            })
            .mentions_count += by;
        Ok(())
    }

    async fn insert_mentions(&self, mentions: &[NewMention]) -> Result<Vec<Mention>, EngineError> {
        let mut state = self.state.lock().await;
        if state.fail_inserts {
            return Err(EngineError::Store("connection reset".to_string()));
        }
        let mut inserted = Vec::new();
        for candidate in mentions {
            if state.collides(candidate) {
                continue;
            }
            let mention = Mention::from_new(Uuid::new_v4(), candidate.clone());
            state.mentions.push(mention.clone());
            inserted.push(mention);
        }
        Ok(inserted)
    }

    async fn count_mentions_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        let state = self.state.lock().await;
        let count = state
            .mentions
            .iter()
            .filter(|m| m.project_id == project_id && m.ingested_at >= from && m.ingested_at < to)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn list_mentions_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<Mention>, EngineError> {
        let state = self.state.lock().await;
        let mut rows: Vec<Mention> = state
            .mentions
            .iter()
            .filter(|m| m.project_id == project_id && m.ingested_at >= from && m.ingested_at < to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        if let Some(limit) = limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(rows)
    }

    async fn sum_reach_between(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        let state = self.state.lock().await;
        Ok(state
            .mentions
            .iter()
            .filter(|m| m.project_id == project_id && m.ingested_at >= from && m.ingested_at < to)
            .map(|m| m.reach_estimate)
            .sum())
    }

    async fn upsert_connector_health(&self, health: &ConnectorHealth) -> Result<(), EngineError> {
        self.state.lock().await.health.insert(
            (health.project_id, health.connector_id.clone()),
            health.clone(),
        );
        Ok(())
    }

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), EngineError> {
        self.state.lock().await.audit.push(entry.clone());
        Ok(())
    }

    async fn has_recent_alert(
        &self,
        account_id: Uuid,
        project_id: Uuid,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let state = self.state.lock().await;
        Ok(state.alerts.iter().any(|a| {
            a.account_id == account_id
                && a.project_id == project_id
                && a.alert_type == alert_type
                && a.created_at >= since
        }))
    }

    async fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, EngineError> {
        let stored = Alert {
            id: Uuid::new_v4(),
            account_id: alert.account_id,
            project_id: alert.project_id,
            alert_type: alert.alert_type,
            message: alert.message.clone(),
            payload: alert.payload.clone(),
            created_at: alert.created_at,
            read_at: None,
        };
        self.state.lock().await.alerts.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;
    use mwatch_core::{Engagement, Sentiment};

    use super::*;

    fn new_mention(project_id: Uuid, url: Option<&str>, hash: Option<&str>) -> NewMention {
        NewMention {
            project_id,
            source: "reddit".to_string(),
            keyword_matched: String::new(),
            title: String::new(),
            text: String::new(),
            author: String::new(),
            url: url.map(str::to_string),
            published_at: None,
            engagement: Engagement::default(),
            follower_count: 0,
            reach_estimate: 0,
            lang: "en".to_string(),
            geo: String::new(),
            sentiment: Sentiment::neutral(0.0),
            similarity_hash: hash.map(str::to_string),
            ingested_at: Utc::now(),
        }
    }

    pub(crate) async fn seeded_account(store: &MemoryStore) -> Uuid {
        let id = Uuid::new_v4();
        store
            .add_account(Account {
                id,
                email: "desk@example.com".to_string(),
                full_name: String::new(),
                plan: "individual".to_string(),
                email_alerts_enabled: false,
            })
            .await;
        id
    }

    #[tokio::test]
    async fn duplicate_url_or_hash_is_skipped_within_and_across_batches() {
        let store = MemoryStore::new();
        let project = Uuid::new_v4();

        let first = store
            .insert_mentions(&[
                new_mention(project, Some("https://a"), Some("h1")),
                new_mention(project, Some("https://a"), Some("h2")),
                new_mention(project, None, Some("h1")),
                new_mention(project, None, None),
                new_mention(project, None, None),
            ])
            .await
            .expect("insert");
        assert_eq!(first.len(), 3);

        let second = store
            .insert_mentions(&[new_mention(project, Some("https://a"), None)])
            .await
            .expect("insert");
        assert!(second.is_empty());

        // Same keys under another project do not collide.
        let other = store
            .insert_mentions(&[new_mention(Uuid::new_v4(), Some("https://a"), Some("h1"))])
            .await
            .expect("insert");
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn ensure_usage_is_idempotent() {
        let store = MemoryStore::new();
        let account = seeded_account(&store).await;
        store.increment_usage(account, "2026-10", 4).await.expect("inc");
        let usage = store.ensure_usage(account, "2026-10").await.expect("ensure");
        assert_eq!(usage.mentions_count, 4);
        let fresh = store.ensure_usage(account, "2026-11").await.expect("ensure");
        assert_eq!(fresh.mentions_count, 0);
    }

    #[tokio::test]
    async fn ensure_usage_requires_an_existing_account() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4();
        let err = store
            .ensure_usage(missing, "2026-10")
            .await
            .expect_err("no such account");
        assert!(matches!(err, EngineError::NotFound { entity: "account", id } if id == missing));
    }

    #[tokio::test]
    async fn recent_alert_respects_since() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let alert = NewAlert {
            account_id: Uuid::nil(),
            project_id: Uuid::nil(),
            alert_type: AlertType::VolumeSpike,
            message: String::new(),
            payload: serde_json::Value::Null,
            created_at: now - Duration::minutes(40),
        };
        store.insert_alert(&alert).await.expect("insert");
        let recent = |since| {
            store.has_recent_alert(Uuid::nil(), Uuid::nil(), AlertType::VolumeSpike, since)
        };
        assert!(recent(now - Duration::minutes(60)).await.expect("query"));
        assert!(!recent(now - Duration::minutes(30)).await.expect("query"));
    }
}
