//! Threshold checks over persisted mentions and the shared alert path.
//!
//! Each check compares a recent window against a baseline and, when it
//! fires, goes through [`AlertEngine::create_alert`], which enforces the
//! per (account, project, type) cooldown before persisting and fanning out.
//! Two passes racing on the same type can both pass the cooldown check; the
//! rare duplicate that results is accepted.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use mwatch_core::{Alert, AlertType, Mention, NewAlert, Project};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::notify::email::EMAIL_MENTION_LIMIT;
use crate::notify::realtime::ALERT_EVENT;
use crate::notify::{alert_email, alert_rooms, EmailSender, RealtimePublisher};
use crate::store::IngestStore;

/// Mentions attached to a window-level alert.
const TRIGGER_MENTION_LIMIT: usize = 10;

/// Longest accepted alert window, one year.
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;
/// Longest accepted cooldown, thirty days.
pub const MAX_COOLDOWN_MINUTES: i64 = 60 * 24 * 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeThresholds {
    pub min_mentions: i64,
    pub multiplier: f64,
    pub window_hours: i64,
    pub compare_window_hours: i64,
}

impl Default for VolumeThresholds {
    fn default() -> Self {
        Self {
            min_mentions: 5,
            multiplier: 2.0,
            window_hours: 1,
            compare_window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SentimentThresholds {
    pub min_mentions: usize,
    /// Percent of negative mentions that fires `sentiment_negative`.
    pub negative_threshold: f64,
    /// Percentage-point rise in negative share that fires `sentiment_shift`.
    pub shift_threshold: f64,
    pub window_hours: i64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            min_mentions: 10,
            negative_threshold: 30.0,
            shift_threshold: 20.0,
            window_hours: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReachThresholds {
    pub min_reach: i64,
    pub multiplier: f64,
}

impl Default for ReachThresholds {
    fn default() -> Self {
        Self {
            min_reach: 10_000,
            multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfluencerThresholds {
    pub min_followers: i64,
}

impl Default for InfluencerThresholds {
    fn default() -> Self {
        Self {
            min_followers: 50_000,
        }
    }
}

/// Every tunable of the alert engine. Deserializes from a partial camelCase
/// map; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertThresholds {
    pub volume_spike: VolumeThresholds,
    pub sentiment_shift: SentimentThresholds,
    pub reach_spike: ReachThresholds,
    pub influencer_mention: InfluencerThresholds,
    pub cooldown_minutes: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            volume_spike: VolumeThresholds::default(),
            sentiment_shift: SentimentThresholds::default(),
            reach_spike: ReachThresholds::default(),
            influencer_mention: InfluencerThresholds::default(),
            cooldown_minutes: 30,
        }
    }
}

fn merge(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                merge(base.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

impl AlertThresholds {
    /// Copy of `self` with the keys present in `overrides` replaced, e.g.
    /// `{"volumeSpike": {"multiplier": 3}}`.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if an override has the wrong type.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, serde_json::Error> {
        let mut merged = serde_json::to_value(self)?;
        merge(&mut merged, overrides);
        let tuned: Self = serde_json::from_value(merged)?;
        tuned
            .validate()
            .map_err(<serde_json::Error as serde::de::Error>::custom)?;
        Ok(tuned)
    }

    /// Windows must be whole hours in `1..=MAX_WINDOW_HOURS`, the volume
    /// baseline must be longer than its window, and the cooldown must lie in
    /// `0..=MAX_COOLDOWN_MINUTES`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first out-of-range value.
    pub fn validate(&self) -> Result<(), String> {
        let hours = [
            ("volumeSpike.windowHours", self.volume_spike.window_hours),
            (
                "volumeSpike.compareWindowHours",
                self.volume_spike.compare_window_hours,
            ),
            ("sentimentShift.windowHours", self.sentiment_shift.window_hours),
        ];
        for (key, value) in hours {
            if !(1..=MAX_WINDOW_HOURS).contains(&value) {
                return Err(format!("{key} must be between 1 and {MAX_WINDOW_HOURS}, got {value}"));
            }
        }
        if self.volume_spike.compare_window_hours <= self.volume_spike.window_hours {
            return Err("volumeSpike.compareWindowHours must exceed volumeSpike.windowHours".to_string());
        }
        if !(0..=MAX_COOLDOWN_MINUTES).contains(&self.cooldown_minutes) {
            return Err(format!(
                "cooldownMinutes must be between 0 and {MAX_COOLDOWN_MINUTES}, got {}",
                self.cooldown_minutes
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Positive,
    Negative,
    Neutral,
}

/// Star-rating labels ("1 star" .. "5 stars") land in the natural bucket.
fn bucket(label: &str) -> Bucket {
    let label = label.to_lowercase();
    if label.contains("positive") || label.contains('4') || label.contains('5') {
        Bucket::Positive
    } else if label.contains("negative") || label.contains('1') || label.contains('2') {
        Bucket::Negative
    } else {
        Bucket::Neutral
    }
}

fn is_negative(mention: &Mention) -> bool {
    bucket(&mention.sentiment.label) == Bucket::Negative
}

/// Percent share of each sentiment bucket in one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentShare {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub total: usize,
}

impl SentimentShare {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn of(mentions: &[Mention]) -> Self {
        let (mut positive, mut negative, mut neutral) = (0_usize, 0_usize, 0_usize);
        for mention in mentions {
            match bucket(&mention.sentiment.label) {
                Bucket::Positive => positive += 1,
                Bucket::Negative => negative += 1,
                Bucket::Neutral => neutral += 1,
            }
        }
        let denominator = mentions.len().max(1) as f64;
        Self {
            positive: positive as f64 * 100.0 / denominator,
            negative: negative as f64 * 100.0 / denominator,
            neutral: neutral as f64 * 100.0 / denominator,
            total: mentions.len(),
        }
    }
}

/// Which window checks fired in one [`AlertEngine::run_all_checks`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub volume_spike: bool,
    pub sentiment_shift: bool,
    pub reach_spike: bool,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[allow(clippy::cast_possible_truncation)]
fn round_i64(value: f64) -> i64 {
    value.round() as i64
}

pub struct AlertEngine {
    store: Arc<dyn IngestStore>,
    realtime: Arc<dyn RealtimePublisher>,
    email: Arc<dyn EmailSender>,
    email_enabled: bool,
    dashboard_url: String,
    thresholds: AlertThresholds,
}

impl AlertEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn IngestStore>,
        realtime: Arc<dyn RealtimePublisher>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            store,
            realtime,
            email,
            email_enabled: false,
            dashboard_url: String::new(),
            thresholds: AlertThresholds::default(),
        }
    }

    /// Turn on the email channel. Accounts can still opt out individually.
    #[must_use]
    pub fn with_email(mut self, dashboard_url: &str) -> Self {
        self.email_enabled = true;
        self.dashboard_url = dashboard_url.to_string();
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Persist and fan out an alert unless one of the same type was raised
    /// for this project within the cooldown. Returns `None` when suppressed.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the cooldown check or the insert.
    /// Notification failures are logged, not returned.
    pub async fn create_alert(
        &self,
        project: &Project,
        alert_type: AlertType,
        message: String,
        payload: Value,
        trigger: &[Mention],
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, EngineError> {
        let since = now - Duration::minutes(self.thresholds.cooldown_minutes);
        if self
            .store
            .has_recent_alert(project.account_id, project.id, alert_type, since)
            .await?
        {
            tracing::debug!(project = %project.id, alert_type = %alert_type, "alert suppressed by cooldown");
            return Ok(None);
        }

        let alert = self
            .store
            .insert_alert(&NewAlert {
                account_id: project.account_id,
                project_id: project.id,
                alert_type,
                message,
                payload,
                created_at: now,
            })
            .await?;

        tracing::info!(
            project = %project.id,
            alert = %alert.id,
            alert_type = %alert_type,
            "alert raised"
        );

        let event = serde_json::to_value(&alert).unwrap_or_default();
        self.realtime
            .publish(
                &alert_rooms(alert.account_id, alert.project_id),
                ALERT_EVENT,
                &event,
            )
            .await;

        self.maybe_email(project, &alert, trigger).await;
        Ok(Some(alert))
    }

    async fn maybe_email(&self, project: &Project, alert: &Alert, trigger: &[Mention]) {
        if !self.email_enabled {
            return;
        }
        let account = match self.store.get_account(alert.account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, account = %alert.account_id, "account lookup for alert email failed");
                return;
            }
        };
        if account.email.trim().is_empty() || !account.email_alerts_enabled {
            return;
        }

        let attached = &trigger[..trigger.len().min(EMAIL_MENTION_LIMIT)];
        let (subject, body) = alert_email(
            &account.full_name,
            &project.name,
            alert,
            attached,
            &self.dashboard_url,
        );
        if !self.email.send(&account.email, &subject, &body).await {
            tracing::warn!(alert = %alert.id, "alert email not delivered");
        }
    }

    /// Fire `volume_spike` when the last `window_hours` hold at least
    /// `max(min_mentions, expected * multiplier)` mentions, where `expected`
    /// is the hourly average of the rest of `compare_window_hours` scaled to
    /// the window.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub async fn check_volume_spike(
        &self,
        project: &Project,
        config: &VolumeThresholds,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let window_start = now - Duration::hours(config.window_hours);
        let compare_start = now - Duration::hours(config.compare_window_hours);

        let recent = self
            .store
            .count_mentions_between(project.id, window_start, now)
            .await?;
        let baseline = self
            .store
            .count_mentions_between(project.id, compare_start, window_start)
            .await?;

        let baseline_hours = config.compare_window_hours - config.window_hours;
        let avg_hourly = if baseline_hours > 0 {
            baseline as f64 / baseline_hours as f64
        } else {
            0.0
        };
        let expected = avg_hourly * config.window_hours as f64;
        let threshold = (config.min_mentions as f64).max(expected * config.multiplier);

        if (recent as f64) < threshold {
            return Ok(false);
        }

        let percent_increase = if expected > 0.0 {
            round_i64((recent as f64 - expected) / expected * 100.0)
        } else {
            100
        };
        let trigger = self
            .store
            .list_mentions_between(
                project.id,
                window_start,
                now,
                Some(TRIGGER_MENTION_LIMIT as i64),
            )
            .await?;

        self.create_alert(
            project,
            AlertType::VolumeSpike,
            format!(
                "Volume spike detected: {recent} mentions in the last {} hour(s) ({percent_increase}% above average)",
                config.window_hours
            ),
            json!({
                "recentCount": recent,
                "avgHourly": round_to(avg_hourly, 2),
                "threshold": round_i64(threshold),
                "percentIncrease": percent_increase,
                "windowHours": config.window_hours,
            }),
            &trigger,
            now,
        )
        .await?;
        Ok(true)
    }

    /// Compare sentiment in the last `window_hours` with the window before.
    /// A high negative share fires `sentiment_negative` and stops there;
    /// otherwise a large rise in negative share fires `sentiment_shift`,
    /// provided the previous window also met `min_mentions`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[allow(clippy::cast_precision_loss)]
    pub async fn check_sentiment_shift(
        &self,
        project: &Project,
        config: &SentimentThresholds,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let window = Duration::hours(config.window_hours);
        let window_start = now - window;
        let previous_start = window_start - window;

        let current_mentions = self
            .store
            .list_mentions_between(project.id, window_start, now, None)
            .await?;
        if current_mentions.len() < config.min_mentions {
            return Ok(false);
        }
        let previous_mentions = self
            .store
            .list_mentions_between(project.id, previous_start, window_start, None)
            .await?;

        let current = SentimentShare::of(&current_mentions);
        let previous = SentimentShare::of(&previous_mentions);
        let negatives: Vec<Mention> = current_mentions
            .iter()
            .filter(|m| is_negative(m))
            .take(TRIGGER_MENTION_LIMIT)
            .cloned()
            .collect();

        if current.negative >= config.negative_threshold {
            self.create_alert(
                project,
                AlertType::SentimentNegative,
                format!(
                    "High negative sentiment: {}% of recent mentions are negative",
                    round_i64(current.negative)
                ),
                json!({
                    "current": current,
                    "previous": previous,
                    "windowHours": config.window_hours,
                    "mentionCount": current_mentions.len(),
                }),
                &negatives,
                now,
            )
            .await?;
            return Ok(true);
        }

        let shift = current.negative - previous.negative;
        if previous.total >= config.min_mentions && shift >= config.shift_threshold {
            self.create_alert(
                project,
                AlertType::SentimentShift,
                format!(
                    "Sentiment shift detected: negative mentions up {} points on the previous period",
                    round_i64(shift)
                ),
                json!({
                    "current": current,
                    "previous": previous,
                    "shift": round_i64(shift),
                    "windowHours": config.window_hours,
                }),
                &negatives,
                now,
            )
            .await?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Fire `reach_spike` when reach summed over the current UTC day reaches
    /// `max(min_reach, daily_average * multiplier)`, the average taken over
    /// the seven days before today.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[allow(clippy::cast_precision_loss)]
    pub async fn check_reach_spike(
        &self,
        project: &Project,
        config: &ReachThresholds,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start = today_start - Duration::days(7);

        let today = self
            .store
            .sum_reach_between(project.id, today_start, now)
            .await?;
        let week = self
            .store
            .sum_reach_between(project.id, week_start, today_start)
            .await?;

        let avg_daily = week as f64 / 7.0;
        let threshold = (config.min_reach as f64).max(avg_daily * config.multiplier);
        if (today as f64) < threshold {
            return Ok(false);
        }

        let ratio = (avg_daily > 0.0).then(|| round_to(today as f64 / avg_daily, 1));
        let message = match ratio {
            Some(ratio) => format!("Reach spike: today's estimated reach is {today} ({ratio}x average)"),
            None => format!("Reach spike: today's estimated reach is {today} (no prior baseline)"),
        };

        self.create_alert(
            project,
            AlertType::ReachSpike,
            message,
            json!({
                "todayReach": today,
                "avgDailyReach": round_i64(avg_daily),
                "multiplier": ratio,
            }),
            &[],
            now,
        )
        .await?;
        Ok(true)
    }

    /// Fire `influencer_mention` for a single mention whose author has at
    /// least `min_followers` followers.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn check_influencer_mention(
        &self,
        project: &Project,
        mention: &Mention,
        config: &InfluencerThresholds,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        if mention.follower_count < config.min_followers {
            return Ok(false);
        }
        let author = if mention.author.is_empty() {
            "Unknown"
        } else {
            mention.author.as_str()
        };

        self.create_alert(
            project,
            AlertType::InfluencerMention,
            format!(
                "Influencer mention: @{author} ({} followers) mentioned your keywords",
                mention.follower_count
            ),
            json!({
                "author": mention.author,
                "followers": mention.follower_count,
                "source": mention.source,
                "mentionId": mention.id,
                "url": mention.url,
            }),
            std::slice::from_ref(mention),
            now,
        )
        .await?;
        Ok(true)
    }

    /// Volume, sentiment and reach checks in that order with the engine's
    /// thresholds. A failing check is logged and reported as not fired.
    pub async fn run_all_checks(&self, project: &Project, now: DateTime<Utc>) -> CheckReport {
        let t = &self.thresholds;
        let report = CheckReport {
            volume_spike: log_check(
                project,
                "volume_spike",
                self.check_volume_spike(project, &t.volume_spike, now).await,
            ),
            sentiment_shift: log_check(
                project,
                "sentiment_shift",
                self.check_sentiment_shift(project, &t.sentiment_shift, now)
                    .await,
            ),
            reach_spike: log_check(
                project,
                "reach_spike",
                self.check_reach_spike(project, &t.reach_spike, now).await,
            ),
        };
        tracing::debug!(project = %project.id, ?report, "alert checks complete");
        report
    }

    /// Run the influencer check over freshly inserted mentions.
    pub async fn check_influencers(&self, project: &Project, mentions: &[Mention], now: DateTime<Utc>) {
        for mention in mentions {
            let result = self
                .check_influencer_mention(project, mention, &self.thresholds.influencer_mention, now)
                .await;
            log_check(project, "influencer_mention", result);
        }
    }
}

fn log_check(project: &Project, check: &'static str, result: Result<bool, EngineError>) -> bool {
    match result {
        Ok(fired) => fired,
        Err(e) => {
            tracing::error!(project = %project.id, check, error = %e, "alert check failed");
            false
        }
    }
}

#[cfg(test)]
#[path = "alerts_test.rs"]
mod tests;
