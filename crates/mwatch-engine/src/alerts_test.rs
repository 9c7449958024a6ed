use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::TimeZone;
use mwatch_core::{Account, Engagement, ProjectStatus, Sentiment};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::*;
use crate::memory::MemoryStore;
use crate::notify::BroadcastPublisher;

#[derive(Default)]
struct RecordingEmail {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        self.sent
            .lock()
            .await
            .push((to.to_string(), subject.to_string(), body.to_string()));
        true
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    realtime: Arc<BroadcastPublisher>,
    email: Arc<RecordingEmail>,
    engine: AlertEngine,
    project: Project,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn project() -> Project {
    Project {
        id: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        name: "Budget".to_string(),
        keywords: vec!["budget".to_string()],
        boolean_query: String::new(),
        sources: BTreeMap::new(),
        schedule_minutes: 30,
        geo_focus: "Nepal".to_string(),
        status: ProjectStatus::Active,
        last_run_at: None,
    }
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let realtime = Arc::new(BroadcastPublisher::new());
    let email = Arc::new(RecordingEmail::default());
    let engine = AlertEngine::new(store.clone(), realtime.clone(), email.clone());
    Fixture {
        store,
        realtime,
        email,
        engine,
        project: project(),
    }
}

fn mention(project: &Project, ingested_at: DateTime<Utc>, label: &str, reach: i64) -> Mention {
    Mention {
        id: Uuid::new_v4(),
        project_id: project.id,
        source: "reddit".to_string(),
        keyword_matched: "budget".to_string(),
        title: format!("Budget news at {ingested_at}"),
        text: String::new(),
        author: "someone".to_string(),
        url: None,
        published_at: None,
        engagement: Engagement::default(),
        follower_count: 0,
        reach_estimate: reach,
        lang: "en".to_string(),
        geo: "Nepal".to_string(),
        sentiment: Sentiment {
            label: label.to_string(),
            confidence: 0.9,
        },
        similarity_hash: None,
        ingested_at,
    }
}

/// One mention per hour across the 23 baseline hours, plus `recent` in the
/// last hour.
async fn seed_volume(f: &Fixture, recent: i64) {
    let mut mentions: Vec<Mention> = (2..=24)
        .map(|h| mention(&f.project, now() - Duration::hours(h) + Duration::minutes(1), "neutral", 0))
        .collect();
    mentions.extend((0..recent).map(|i| {
        mention(&f.project, now() - Duration::minutes(5 + i), "neutral", 0)
    }));
    f.store.seed_mentions(mentions).await;
}

#[tokio::test]
async fn volume_spike_fires_once_within_cooldown() {
    let f = fixture();
    seed_volume(&f, 6).await;
    let config = VolumeThresholds::default();

    assert!(f
        .engine
        .check_volume_spike(&f.project, &config, now())
        .await
        .expect("check"));
    let alerts = f.store.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::VolumeSpike);
    assert_eq!(alerts[0].payload["recentCount"], 6);
    assert_eq!(alerts[0].payload["avgHourly"], 1.0);
    assert_eq!(alerts[0].payload["threshold"], 5);
    assert_eq!(alerts[0].payload["percentIncrease"], 500);
    assert_eq!(alerts[0].payload["windowHours"], 1);

    f.engine
        .check_volume_spike(&f.project, &config, now() + Duration::minutes(2))
        .await
        .expect("check");
    assert_eq!(f.store.alerts().await.len(), 1);
}

#[tokio::test]
async fn volume_below_minimum_does_not_fire() {
    let f = fixture();
    let mentions = (0..4)
        .map(|i| mention(&f.project, now() - Duration::minutes(10 + i), "neutral", 0))
        .collect();
    f.store.seed_mentions(mentions).await;

    assert!(!f
        .engine
        .check_volume_spike(&f.project, &VolumeThresholds::default(), now())
        .await
        .expect("check"));
    assert!(f.store.alerts().await.is_empty());
}

#[tokio::test]
async fn volume_without_baseline_reports_hundred_percent() {
    let f = fixture();
    let mentions = (0..5)
        .map(|i| mention(&f.project, now() - Duration::minutes(10 + i), "neutral", 0))
        .collect();
    f.store.seed_mentions(mentions).await;

    assert!(f
        .engine
        .check_volume_spike(&f.project, &VolumeThresholds::default(), now())
        .await
        .expect("check"));
    assert_eq!(f.store.alerts().await[0].payload["percentIncrease"], 100);
}

#[tokio::test]
async fn cooldown_expires_after_thirty_minutes() {
    let f = fixture();
    seed_volume(&f, 6).await;
    f.store
        .seed_alert(Alert {
            id: Uuid::new_v4(),
            account_id: f.project.account_id,
            project_id: f.project.id,
            alert_type: AlertType::VolumeSpike,
            message: String::new(),
            payload: Value::Null,
            created_at: now() - Duration::minutes(31),
            read_at: None,
        })
        .await;

    f.engine
        .check_volume_spike(&f.project, &VolumeThresholds::default(), now())
        .await
        .expect("check");
    assert_eq!(f.store.alerts().await.len(), 2);
}

#[tokio::test]
async fn cooldown_is_per_type() {
    let f = fixture();
    let first = f
        .engine
        .create_alert(&f.project, AlertType::NewMentions, "a".to_string(), Value::Null, &[], now())
        .await
        .expect("create");
    let other_type = f
        .engine
        .create_alert(&f.project, AlertType::ReachSpike, "b".to_string(), Value::Null, &[], now())
        .await
        .expect("create");
    let repeat = f
        .engine
        .create_alert(&f.project, AlertType::NewMentions, "c".to_string(), Value::Null, &[], now())
        .await
        .expect("create");

    assert!(first.is_some());
    assert!(other_type.is_some());
    assert!(repeat.is_none());
}

#[tokio::test]
async fn high_negative_share_fires_sentiment_negative() {
    let f = fixture();
    let mut mentions: Vec<Mention> = (0..3)
        .map(|i| mention(&f.project, now() - Duration::minutes(10 + i), "negative", 0))
        .collect();
    mentions.extend((0..7).map(|i| mention(&f.project, now() - Duration::minutes(20 + i), "positive", 0)));
    f.store.seed_mentions(mentions).await;

    assert!(f
        .engine
        .check_sentiment_shift(&f.project, &SentimentThresholds::default(), now())
        .await
        .expect("check"));
    let alerts = f.store.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::SentimentNegative);
    assert_eq!(alerts[0].payload["mentionCount"], 10);
    assert_eq!(alerts[0].payload["current"]["negative"], 30.0);
}

#[tokio::test]
async fn rising_negative_share_fires_sentiment_shift() {
    let f = fixture();
    let mut mentions: Vec<Mention> = (0..10)
        .map(|i| mention(&f.project, now() - Duration::hours(7) - Duration::minutes(i), "positive", 0))
        .collect();
    mentions.extend((0..2).map(|i| mention(&f.project, now() - Duration::minutes(10 + i), "1 star", 0)));
    mentions.extend((0..8).map(|i| mention(&f.project, now() - Duration::minutes(30 + i), "neutral", 0)));
    f.store.seed_mentions(mentions).await;

    assert!(f
        .engine
        .check_sentiment_shift(&f.project, &SentimentThresholds::default(), now())
        .await
        .expect("check"));
    let alerts = f.store.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::SentimentShift);
    assert_eq!(alerts[0].payload["shift"], 20);
}

#[tokio::test]
async fn shift_needs_a_full_previous_window() {
    let f = fixture();
    let mut mentions: Vec<Mention> = (0..2)
        .map(|i| mention(&f.project, now() - Duration::minutes(10 + i), "negative", 0))
        .collect();
    mentions.extend((0..8).map(|i| mention(&f.project, now() - Duration::minutes(30 + i), "neutral", 0)));
    mentions.push(mention(&f.project, now() - Duration::hours(8), "positive", 0));
    f.store.seed_mentions(mentions).await;

    assert!(!f
        .engine
        .check_sentiment_shift(&f.project, &SentimentThresholds::default(), now())
        .await
        .expect("check"));
}

#[tokio::test]
async fn sentiment_needs_minimum_mentions() {
    let f = fixture();
    let mentions = (0..9)
        .map(|i| mention(&f.project, now() - Duration::minutes(10 + i), "negative", 0))
        .collect();
    f.store.seed_mentions(mentions).await;

    assert!(!f
        .engine
        .check_sentiment_shift(&f.project, &SentimentThresholds::default(), now())
        .await
        .expect("check"));
}

#[test]
fn star_labels_map_to_buckets() {
    assert_eq!(bucket("5 stars"), Bucket::Positive);
    assert_eq!(bucket("4 stars"), Bucket::Positive);
    assert_eq!(bucket("1 star"), Bucket::Negative);
    assert_eq!(bucket("2 stars"), Bucket::Negative);
    assert_eq!(bucket("3 stars"), Bucket::Neutral);
    assert_eq!(bucket("NEGATIVE"), Bucket::Negative);
    assert_eq!(bucket(""), Bucket::Neutral);
}

#[test]
fn empty_window_share_is_zero() {
    let share = SentimentShare::of(&[]);
    assert_eq!(share.total, 0);
    assert!(share.negative.abs() < f64::EPSILON);
}

#[tokio::test]
async fn reach_spike_compares_today_with_trailing_week() {
    let f = fixture();
    let today = now() - Duration::hours(4);
    f.store
        .seed_mentions(vec![
            mention(&f.project, today, "neutral", 8_000),
            mention(&f.project, today, "neutral", 4_000),
            mention(&f.project, now() - Duration::days(2), "neutral", 7_000),
            mention(&f.project, now() - Duration::days(9), "neutral", 900_000),
        ])
        .await;

    assert!(f
        .engine
        .check_reach_spike(&f.project, &ReachThresholds::default(), now())
        .await
        .expect("check"));
    let alerts = f.store.alerts().await;
    assert_eq!(alerts[0].alert_type, AlertType::ReachSpike);
    assert_eq!(alerts[0].payload["todayReach"], 12_000);
    assert_eq!(alerts[0].payload["avgDailyReach"], 1_000);
    assert_eq!(alerts[0].payload["multiplier"], 12.0);
}

#[tokio::test]
async fn reach_below_minimum_does_not_fire() {
    let f = fixture();
    f.store
        .seed_mentions(vec![mention(&f.project, now() - Duration::hours(1), "neutral", 9_999)])
        .await;

    assert!(!f
        .engine
        .check_reach_spike(&f.project, &ReachThresholds::default(), now())
        .await
        .expect("check"));
}

#[tokio::test]
async fn reach_without_baseline_has_null_multiplier() {
    let f = fixture();
    f.store
        .seed_mentions(vec![mention(&f.project, now() - Duration::hours(1), "neutral", 10_000)])
        .await;

    assert!(f
        .engine
        .check_reach_spike(&f.project, &ReachThresholds::default(), now())
        .await
        .expect("check"));
    assert!(f.store.alerts().await[0].payload["multiplier"].is_null());
}

#[tokio::test]
async fn influencer_mention_fires_per_mention() {
    let f = fixture();
    let mut big = mention(&f.project, now(), "neutral", 0);
    big.follower_count = 60_000;
    big.author = "famous".to_string();
    let small = mention(&f.project, now(), "neutral", 0);
    let config = InfluencerThresholds::default();

    assert!(!f
        .engine
        .check_influencer_mention(&f.project, &small, &config, now())
        .await
        .expect("check"));
    assert!(f
        .engine
        .check_influencer_mention(&f.project, &big, &config, now())
        .await
        .expect("check"));

    let alerts = f.store.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].payload["author"], "famous");
    assert_eq!(alerts[0].payload["followers"], 60_000);
    assert_eq!(alerts[0].payload["mentionId"], big.id.to_string());
}

#[tokio::test]
async fn new_alert_is_published_once_to_both_rooms() {
    let f = fixture();
    let mut rx = f.realtime.subscribe();

    f.engine
        .create_alert(&f.project, AlertType::NewMentions, "3 new mentions for Budget.".to_string(), json!({"count": 3}), &[], now())
        .await
        .expect("create");

    let event = rx.recv().await.expect("event");
    assert_eq!(event.event, "alert");
    assert_eq!(
        event.rooms,
        vec![
            format!("user:{}", f.project.account_id),
            format!("project:{}", f.project.id)
        ]
    );
    assert_eq!(event.payload["type"], "new_mentions");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn email_goes_to_opted_in_accounts_only() {
    let f = fixture();
    let engine = AlertEngine::new(f.store.clone(), f.realtime.clone(), f.email.clone())
        .with_email("http://localhost:5173/dashboard");
    f.store
        .add_account(Account {
            id: f.project.account_id,
            email: "asha@example.com".to_string(),
            full_name: "Asha".to_string(),
            plan: "team".to_string(),
            email_alerts_enabled: true,
        })
        .await;
    let trigger: Vec<Mention> = (0..7).map(|i| mention(&f.project, now() - Duration::minutes(i), "neutral", 0)).collect();

    engine
        .create_alert(&f.project, AlertType::VolumeSpike, "spike".to_string(), Value::Null, &trigger, now())
        .await
        .expect("create");

    let sent = f.email.sent.lock().await.clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "asha@example.com");
    assert_eq!(sent[0].1, "mwatch alert: Budget - Volume Spike");
    assert_eq!(sent[0].2.matches("\n- ").count(), 5);

    let opted_out = project();
    f.store
        .add_account(Account {
            id: opted_out.account_id,
            email: "ram@example.com".to_string(),
            full_name: "Ram".to_string(),
            plan: "team".to_string(),
            email_alerts_enabled: false,
        })
        .await;
    engine
        .create_alert(&opted_out, AlertType::VolumeSpike, "spike".to_string(), Value::Null, &[], now())
        .await
        .expect("create");
    assert_eq!(f.email.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn email_channel_off_by_default() {
    let f = fixture();
    f.store
        .add_account(Account {
            id: f.project.account_id,
            email: "asha@example.com".to_string(),
            full_name: "Asha".to_string(),
            plan: "team".to_string(),
            email_alerts_enabled: true,
        })
        .await;

    f.engine
        .create_alert(&f.project, AlertType::ReachSpike, "reach".to_string(), Value::Null, &[], now())
        .await
        .expect("create");
    assert!(f.email.sent.lock().await.is_empty());
}

#[tokio::test]
async fn run_all_checks_reports_each_check() {
    let f = fixture();
    seed_volume(&f, 6).await;

    let report = f.engine.run_all_checks(&f.project, now()).await;
    assert_eq!(
        report,
        CheckReport {
            volume_spike: true,
            sentiment_shift: false,
            reach_spike: false,
        }
    );
}

#[test]
fn overrides_replace_only_named_keys() {
    let base = AlertThresholds::default();
    let tuned = base
        .with_overrides(&json!({
            "volumeSpike": {"multiplier": 3.0},
            "cooldownMinutes": 10
        }))
        .expect("valid overrides");

    assert!((tuned.volume_spike.multiplier - 3.0).abs() < f64::EPSILON);
    assert_eq!(tuned.volume_spike.min_mentions, 5);
    assert_eq!(tuned.cooldown_minutes, 10);
    assert_eq!(tuned.sentiment_shift, base.sentiment_shift);

    assert!(base
        .with_overrides(&json!({"reachSpike": {"minReach": "lots"}}))
        .is_err());
}

#[test]
fn out_of_range_overrides_are_rejected() {
    let base = AlertThresholds::default();
    for overrides in [
        json!({"volumeSpike": {"windowHours": 9_000_000_000_000_000_i64}}),
        json!({"volumeSpike": {"windowHours": 0}}),
        json!({"volumeSpike": {"windowHours": 24, "compareWindowHours": 24}}),
        json!({"sentimentShift": {"windowHours": -6}}),
        json!({"cooldownMinutes": i64::MAX}),
        json!({"cooldownMinutes": -1}),
    ] {
        assert!(base.with_overrides(&overrides).is_err(), "{overrides}");
    }

    let widest = base
        .with_overrides(&json!({
            "volumeSpike": {"windowHours": MAX_WINDOW_HOURS - 1, "compareWindowHours": MAX_WINDOW_HOURS},
            "cooldownMinutes": 0
        }))
        .expect("bounds are inclusive");
    assert_eq!(widest.volume_spike.compare_window_hours, MAX_WINDOW_HOURS);
}

#[tokio::test]
async fn widest_accepted_windows_run_without_overflow() {
    let f = fixture();
    let config = VolumeThresholds {
        window_hours: MAX_WINDOW_HOURS - 1,
        compare_window_hours: MAX_WINDOW_HOURS,
        ..VolumeThresholds::default()
    };
    let fired = f
        .engine
        .check_volume_spike(&f.project, &config, now())
        .await
        .expect("check");
    assert!(!fired);
}

#[test]
fn thresholds_deserialize_from_partial_map() {
    let parsed: AlertThresholds =
        serde_json::from_value(json!({"influencerMention": {"minFollowers": 1000}})).expect("parse");
    assert_eq!(parsed.influencer_mention.min_followers, 1_000);
    assert_eq!(parsed.reach_spike, ReachThresholds::default());
}
