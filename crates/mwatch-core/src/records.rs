//! Bookkeeping records written around an ingestion pass: connector health,
//! monthly usage, alerts, and the audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::CoreError;

/// Outcome of a connector's most recent fetch for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    NoData,
    Degraded,
    /// Structurally unusable. Only ever set by an external signal.
    Down,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoData => "no_data",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "no_data" => Ok(Self::NoData),
            "degraded" => Ok(Self::Degraded),
            "down" => Ok(Self::Down),
            other => Err(CoreError::InvalidHealthStatus(other.to_string())),
        }
    }
}

/// Latest health of one (project, connector) pair. Overwritten every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorHealth {
    pub project_id: Uuid,
    pub connector_id: String,
    pub status: HealthStatus,
    pub last_error: String,
    pub last_checked_at: DateTime<Utc>,
}

/// Running mention count for one account in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub account_id: Uuid,
    /// `YYYY-MM`, UTC.
    pub month: String,
    pub mentions_count: i64,
}

/// UTC month key used to scope [`Usage`] records.
#[must_use]
pub fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    NewMentions,
    VolumeSpike,
    SentimentNegative,
    SentimentShift,
    ReachSpike,
    InfluencerMention,
}

impl AlertType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewMentions => "new_mentions",
            Self::VolumeSpike => "volume_spike",
            Self::SentimentNegative => "sentiment_negative",
            Self::SentimentShift => "sentiment_shift",
            Self::ReachSpike => "reach_spike",
            Self::InfluencerMention => "influencer_mention",
        }
    }

    /// Human label used in notification subjects.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NewMentions => "New Mentions",
            Self::VolumeSpike => "Volume Spike",
            Self::SentimentNegative => "Negative Sentiment",
            Self::SentimentShift => "Sentiment Shift",
            Self::ReachSpike => "Reach Spike",
            Self::InfluencerMention => "Influencer Mention",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_mentions" => Ok(Self::NewMentions),
            "volume_spike" => Ok(Self::VolumeSpike),
            "sentiment_negative" => Ok(Self::SentimentNegative),
            "sentiment_shift" => Ok(Self::SentimentShift),
            "reach_spike" => Ok(Self::ReachSpike),
            "influencer_mention" => Ok(Self::InfluencerMention),
            other => Err(CoreError::InvalidAlertType(other.to_string())),
        }
    }
}

/// An alert about to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub account_id: Uuid,
    pub project_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// A persisted alert. Append-only apart from `read_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub account_id: Uuid,
    pub project_id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
}

impl AuditLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// One audit-trail line keyed by project and connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub account_id: Uuid,
    pub project_id: Uuid,
    pub connector_id: String,
    pub level: AuditLevel,
    pub message: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// The slice of an account the engine needs: plan and notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: String,
    pub email_alerts_enabled: bool,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn month_key_is_zero_padded() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(month_key(at), "2026-03");
    }

    #[test]
    fn health_status_parses_all_variants() {
        for status in [
            HealthStatus::Ok,
            HealthStatus::NoData,
            HealthStatus::Degraded,
            HealthStatus::Down,
        ] {
            assert_eq!(status.as_str().parse::<HealthStatus>(), Ok(status));
        }
        assert!("broken".parse::<HealthStatus>().is_err());
    }

    #[test]
    fn alert_type_parses_all_variants() {
        for t in [
            AlertType::NewMentions,
            AlertType::VolumeSpike,
            AlertType::SentimentNegative,
            AlertType::SentimentShift,
            AlertType::ReachSpike,
            AlertType::InfluencerMention,
        ] {
            assert_eq!(t.as_str().parse::<AlertType>(), Ok(t));
        }
    }

    #[test]
    fn alert_serializes_type_field() {
        let alert = Alert {
            id: Uuid::nil(),
            account_id: Uuid::nil(),
            project_id: Uuid::nil(),
            alert_type: AlertType::VolumeSpike,
            message: "spike".to_string(),
            payload: serde_json::json!({"recentCount": 6}),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            read_at: None,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "volume_spike");
    }
}
