//! End-to-end ingestion passes and scheduler ticks over the in-memory store
//! with scripted connectors.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{
    month_key, Account, AlertType, AuditLevel, Engagement, HealthStatus, Project, ProjectStatus,
    RawMention,
};
use mwatch_engine::{
    AlertEngine, BroadcastPublisher, EngineError, IngestOptions, IngestionOrchestrator,
    MemoryStore, NoopEmailSender, Scheduler, SchedulerConfig, SkipReason,
};
use mwatch_sources::{
    Connector, ConnectorCapabilities, ConnectorRegistry, LexiconClassifier, SourceError,
};
use tokio::sync::Mutex;
use uuid::Uuid;

enum Script {
    Return(Vec<RawMention>),
    Fail(&'static str),
    Hang(Duration),
}

struct ScriptedConnector {
    id: &'static str,
    enabled_by_default: bool,
    script: Script,
    calls: AtomicUsize,
    since: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl ScriptedConnector {
    fn new(id: &'static str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            id,
            enabled_by_default: true,
            script,
            calls: AtomicUsize::new(0),
            since: Mutex::new(Vec::new()),
        })
    }

    fn off_by_default(id: &'static str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            id,
            enabled_by_default: false,
            script,
            calls: AtomicUsize::new(0),
            since: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.id
    }

    fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            realtime: false,
            search: true,
            limits: "scripted",
        }
    }

    async fn fetch(
        &self,
        _project: &Project,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.since.lock().await.push(since);
        match &self.script {
            Script::Return(mentions) => Ok(mentions.clone()),
            Script::Fail(reason) => Err(SourceError::Parse {
                source_id: self.id,
                reason: (*reason).to_string(),
            }),
            Script::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }
}

fn raw(source: &str, title: &str, url: Option<&str>) -> RawMention {
    RawMention {
        source: source.to_string(),
        title: title.to_string(),
        text: String::new(),
        author: "reporter".to_string(),
        url: url.map(str::to_string),
        published_at: None,
        engagement: Engagement::default(),
        follower_count: 0,
    }
}

fn project(keywords: &[&str]) -> Project {
    Project {
        id: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        name: "Budget".to_string(),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        boolean_query: String::new(),
        sources: BTreeMap::new(),
        schedule_minutes: 30,
        geo_focus: "Nepal".to_string(),
        status: ProjectStatus::Active,
        last_run_at: None,
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    orchestrator: Arc<IngestionOrchestrator>,
    project: Project,
}

async fn harness(connectors: Vec<Arc<dyn Connector>>, project: Project, plan: &str) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store
        .add_account(Account {
            id: project.account_id,
            email: "owner@example.com".to_string(),
            full_name: "Owner".to_string(),
            plan: plan.to_string(),
            email_alerts_enabled: true,
        })
        .await;
    store.add_project(project.clone()).await;

    let alerts = Arc::new(AlertEngine::new(
        store.clone(),
        Arc::new(BroadcastPublisher::new()),
        Arc::new(NoopEmailSender),
    ));
    let orchestrator = IngestionOrchestrator::new(
        store.clone(),
        ConnectorRegistry::new(connectors),
        Arc::new(LexiconClassifier),
        alerts,
    )
    .with_connector_timeout(Duration::from_secs(25));

    Harness {
        store,
        orchestrator: Arc::new(orchestrator),
        project,
    }
}

// ---------------------------------------------------------------------------
// ingestion pass
// ---------------------------------------------------------------------------

#[tokio::test]
async fn keyword_filter_keeps_matches_and_drops_the_rest() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![
            raw("local_news", "The new Budget plan passed", Some("https://n/1")),
            raw("local_news", "Unrelated news", Some("https://n/2")),
        ]),
    );
    let h = harness(vec![news.clone()], project(&["budget"]), "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.status, Some(ProjectStatus::Active));
    let mentions = h.store.mentions().await;
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].title, "The new Budget plan passed");
    assert_eq!(mentions[0].keyword_matched, "budget");
    assert_eq!(outcome.connectors[0].fetched, 2);
    assert_eq!(outcome.connectors[0].matched, 1);
}

#[tokio::test]
async fn duplicate_urls_count_once() {
    let reddit = ScriptedConnector::new(
        "reddit",
        Script::Return(vec![
            raw("reddit", "Budget thread", Some("https://reddit.com/r/x/1")),
            raw("reddit", "Budget thread, reposted", Some("https://reddit.com/r/x/1")),
        ]),
    );
    let h = harness(vec![reddit], project(&["budget"]), "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 1);
    assert_eq!(h.store.mentions().await.len(), 1);
    let usage = h
        .store
        .usage(h.project.account_id, &month_key(Utc::now()))
        .await
        .expect("usage");
    assert_eq!(usage.mentions_count, 1);
}

#[tokio::test]
async fn near_duplicate_text_is_dropped_by_fingerprint() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![
            raw("local_news", "Budget: passed!", Some("https://a/1")),
            raw("local_news", "budget passed", Some("https://b/2")),
        ]),
    );
    let h = harness(vec![news], project(&["budget"]), "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");
    assert_eq!(outcome.inserted, 1);
}

#[tokio::test]
async fn second_pass_reports_only_new_rows() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Budget tabled", Some("https://n/1"))]),
    );
    let h = harness(vec![news], project(&["budget"]), "team").await;

    let first = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");
    let second = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(first.inserted, 1);
    assert_eq!(second.inserted, 0);
    let health = h.store.health(h.project.id, "localNews").await.expect("health");
    assert_eq!(health.status, HealthStatus::NoData);
}

#[tokio::test]
async fn paused_project_is_skipped_without_side_effects() {
    let news = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let mut paused = project(&["budget"]);
    paused.status = ProjectStatus::Paused;
    let h = harness(vec![news.clone()], paused, "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.status, Some(ProjectStatus::Paused));
    assert_eq!(outcome.reason, None);
    assert_eq!(news.calls(), 0);
    assert!(h.store.health_records().await.is_empty());
    assert_eq!(
        serde_json::to_value(&outcome).expect("json"),
        serde_json::json!({"inserted": 0, "status": "paused"})
    );
}

#[tokio::test]
async fn forced_pass_runs_a_paused_project_and_keeps_it_paused() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Budget tabled", Some("https://n/1"))]),
    );
    let mut paused = project(&["budget"]);
    paused.status = ProjectStatus::Paused;
    let h = harness(vec![news.clone()], paused, "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(
            &h.project,
            IngestOptions {
                force: true,
                auto_pause: false,
            },
        )
        .await
        .expect("pass");

    assert_eq!(news.calls(), 1);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.status, Some(ProjectStatus::Paused));
}

#[tokio::test]
async fn failing_connector_does_not_stop_the_others() {
    let broken = ScriptedConnector::new("youtube", Script::Fail("quota exceeded"));
    let reddit = ScriptedConnector::new(
        "reddit",
        Script::Return(vec![raw("reddit", "Budget debate", Some("https://r/1"))]),
    );
    let h = harness(vec![broken.clone(), reddit.clone()], project(&["budget"]), "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 1);
    assert_eq!(reddit.calls(), 1);

    let youtube = h.store.health(h.project.id, "youtube").await.expect("health");
    assert_eq!(youtube.status, HealthStatus::Degraded);
    assert!(youtube.last_error.contains("quota exceeded"));
    let reddit_health = h.store.health(h.project.id, "reddit").await.expect("health");
    assert_eq!(reddit_health.status, HealthStatus::Ok);
    assert!(reddit_health.last_error.is_empty());

    let audit = h.store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].connector_id, "youtube");
    assert_eq!(audit[0].level, AuditLevel::Error);
    assert!(audit[0].message.contains("quota exceeded"));
}

#[tokio::test(start_paused = true)]
async fn slow_connector_times_out_as_a_failure() {
    let slow = ScriptedConnector::new("x", Script::Hang(Duration::from_secs(60)));
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Budget tabled", Some("https://n/1"))]),
    );
    let h = harness(vec![slow, news], project(&["budget"]), "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 1);
    let x = h.store.health(h.project.id, "x").await.expect("health");
    assert_eq!(x.status, HealthStatus::Degraded);
    assert!(x.last_error.contains("timed out"));
}

#[tokio::test]
async fn quota_reached_refuses_before_any_connector_runs() {
    let news = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let h = harness(vec![news.clone()], project(&["budget"]), "individual").await;
    h.store
        .set_usage(h.project.account_id, &month_key(Utc::now()), 3_000)
        .await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.reason, Some(SkipReason::Limit));
    assert_eq!(news.calls(), 0);
    assert_eq!(
        serde_json::to_value(&outcome).expect("json"),
        serde_json::json!({"inserted": 0, "reason": "limit"})
    );
}

#[tokio::test]
async fn missing_account_is_treated_as_over_limit() {
    let news = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let h = harness(vec![news.clone()], project(&["budget"]), "team").await;
    let orphan = project(&["budget"]);

    let outcome = h
        .orchestrator
        .ingest_project(&orphan, IngestOptions::default())
        .await
        .expect("pass");
    assert_eq!(outcome.reason, Some(SkipReason::Limit));
    assert_eq!(news.calls(), 0);
}

#[tokio::test]
async fn nothing_relevant_means_no_data_and_no_alert() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Weather today", Some("https://n/1"))]),
    );
    let h = harness(vec![news], project(&["budget"]), "team").await;

    let outcome = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    assert_eq!(outcome.inserted, 0);
    let health = h.store.health(h.project.id, "localNews").await.expect("health");
    assert_eq!(health.status, HealthStatus::NoData);
    assert!(h.store.alerts().await.is_empty());
    let usage = h
        .store
        .usage(h.project.account_id, &month_key(Utc::now()))
        .await
        .expect("usage ensured");
    assert_eq!(usage.mentions_count, 0);
}

#[tokio::test]
async fn inserted_mentions_raise_a_new_mentions_alert() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![
            raw("local_news", "Budget tabled", Some("https://n/1")),
            raw("local_news", "Budget passed", Some("https://n/2")),
        ]),
    );
    let h = harness(vec![news], project(&["budget"]), "team").await;

    h.orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    let alerts = h.store.alerts().await;
    let new_mentions: Vec<_> = alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::NewMentions)
        .collect();
    assert_eq!(new_mentions.len(), 1);
    assert_eq!(new_mentions[0].message, "2 new mentions for Budget.");
    assert_eq!(new_mentions[0].payload["count"], 2);
}

#[tokio::test]
async fn high_follower_author_raises_influencer_alert() {
    let mut famous = raw("x", "Budget is a mess", Some("https://x/1"));
    famous.follower_count = 80_000;
    famous.author = "anchor".to_string();
    let x = ScriptedConnector::new("x", Script::Return(vec![famous]));
    let h = harness(vec![x], project(&["budget"]), "team").await;

    h.orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    let alerts = h.store.alerts().await;
    assert!(alerts
        .iter()
        .any(|a| a.alert_type == AlertType::InfluencerMention && a.payload["author"] == "anchor"));
}

#[tokio::test]
async fn mentions_are_enriched_before_insert() {
    let mut video = raw("youtube", "Budget explained", Some("https://yt/1"));
    video.text = "A wonderful breakdown".to_string();
    video.engagement.likes = 40;
    let youtube = ScriptedConnector::new("youtube", Script::Return(vec![video]));
    let h = harness(vec![youtube], project(&["budget"]), "team").await;

    h.orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");

    let mention = h.store.mentions().await.remove(0);
    assert_eq!(mention.reach_estimate, 400);
    assert_eq!(mention.lang, "en");
    assert_eq!(mention.geo, "Nepal");
    assert_eq!(mention.sentiment.label, "positive");
    assert_eq!(
        mention.similarity_hash,
        mwatch_engine::fingerprint("Budget explained A wonderful breakdown")
    );
}

#[tokio::test]
async fn connector_flags_follow_project_then_default() {
    let on = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let off = ScriptedConnector::off_by_default("x", Script::Return(vec![]));
    let mut p = project(&["budget"]);
    p.sources.insert("localNews".to_string(), false);
    let h = harness(vec![on.clone(), off.clone()], p, "team").await;

    h.orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");
    assert_eq!(on.calls(), 0);
    assert_eq!(off.calls(), 0);

    let mut enabled = h.project.clone();
    enabled.sources.insert("x".to_string(), true);
    h.orchestrator
        .ingest_project(&enabled, IngestOptions::default())
        .await
        .expect("pass");
    assert_eq!(off.calls(), 1);
}

#[tokio::test]
async fn connectors_receive_the_previous_run_time() {
    let news = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let mut p = project(&["budget"]);
    let previous = Utc::now() - chrono::Duration::hours(2);
    p.last_run_at = Some(previous);
    let h = harness(vec![news.clone()], p, "team").await;

    h.orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect("pass");
    assert_eq!(*news.since.lock().await, vec![Some(previous)]);
}

#[tokio::test]
async fn pass_stamps_last_run_and_honours_auto_pause() {
    let news = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let h = harness(vec![news], project(&["budget"]), "team").await;

    h.orchestrator
        .ingest_project(
            &h.project,
            IngestOptions {
                force: false,
                auto_pause: true,
            },
        )
        .await
        .expect("pass");

    let stored = h.store.project(h.project.id).await.expect("project");
    assert!(stored.last_run_at.is_some());
    assert_eq!(stored.status, ProjectStatus::Paused);
}

#[tokio::test]
async fn persistence_failure_aborts_but_still_stamps_last_run() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Budget tabled", Some("https://n/1"))]),
    );
    let h = harness(vec![news], project(&["budget"]), "team").await;
    h.store.set_fail_inserts(true).await;

    let err = h
        .orchestrator
        .ingest_project(&h.project, IngestOptions::default())
        .await
        .expect_err("insert failure propagates");
    assert!(matches!(err, EngineError::Store(_)));

    let stored = h.store.project(h.project.id).await.expect("project");
    assert!(stored.last_run_at.is_some());
}

// ---------------------------------------------------------------------------
// scheduler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tick_runs_only_due_projects() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Budget tabled", Some("https://n/1"))]),
    );
    let h = harness(vec![news.clone()], project(&["budget"]), "team").await;

    let mut recent = project(&["budget"]);
    recent.account_id = h.project.account_id;
    recent.name = "Recent".to_string();
    recent.last_run_at = Some(Utc::now() - chrono::Duration::minutes(5));
    h.store.add_project(recent.clone()).await;

    let scheduler = Scheduler::new(h.orchestrator.clone(), SchedulerConfig::default());
    let summary = scheduler.run_tick(Utc::now()).await.expect("tick");

    assert_eq!(summary.active, 2);
    assert_eq!(summary.due, 1);
    assert_eq!(summary.ran, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(news.calls(), 1);

    let again = scheduler.run_tick(Utc::now()).await.expect("tick");
    assert_eq!(again.due, 0);
    assert_eq!(news.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn overlapping_ticks_never_run_a_project_twice() {
    let slow = ScriptedConnector::new("localNews", Script::Hang(Duration::from_secs(10)));
    let h = harness(vec![slow.clone()], project(&["budget"]), "team").await;
    let scheduler = Scheduler::new(h.orchestrator.clone(), SchedulerConfig::default());

    let now = Utc::now();
    let (first, second) = tokio::join!(scheduler.run_tick(now), scheduler.run_tick(now));
    let first = first.expect("tick");
    let second = second.expect("tick");

    assert_eq!(slow.calls(), 1);
    assert_eq!(first.ran + second.ran, 1);
}

#[tokio::test]
async fn scheduled_auto_pause_takes_project_out_of_rotation() {
    let news = ScriptedConnector::new("localNews", Script::Return(vec![]));
    let h = harness(vec![news.clone()], project(&["budget"]), "team").await;
    let scheduler = Scheduler::new(
        h.orchestrator.clone(),
        SchedulerConfig {
            max_concurrent_projects: 2,
            auto_pause: true,
        },
    );

    scheduler.run_tick(Utc::now()).await.expect("tick");
    let later = Utc::now() + chrono::Duration::hours(2);
    let summary = scheduler.run_tick(later).await.expect("tick");

    assert_eq!(summary.active, 0);
    assert_eq!(news.calls(), 1);
}

#[tokio::test]
async fn failed_pass_is_counted_and_tick_succeeds() {
    let news = ScriptedConnector::new(
        "localNews",
        Script::Return(vec![raw("local_news", "Budget tabled", Some("https://n/1"))]),
    );
    let h = harness(vec![news], project(&["budget"]), "team").await;
    h.store.set_fail_inserts(true).await;

    let scheduler = Scheduler::new(h.orchestrator.clone(), SchedulerConfig::default());
    let summary = scheduler.run_tick(Utc::now()).await.expect("tick");

    assert_eq!(summary.due, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.ran, 0);
}
