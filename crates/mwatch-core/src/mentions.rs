//! Mention shapes: the source-agnostic candidate an adapter returns, the
//! enriched row the orchestrator persists, and the persisted fact itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engagement counters reported by a source. Absent counters are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// A candidate mention as returned by a connector, before filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMention {
    /// Source identifier, e.g. `reddit` or `local_news`.
    pub source: String,
    pub title: String,
    pub text: String,
    pub author: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: Engagement,
    /// Follower or subscriber count of the author, `0` when unknown.
    pub follower_count: i64,
}

impl RawMention {
    /// Title and body joined by a space and trimmed; the text every filter sees.
    #[must_use]
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.text).trim().to_string()
    }
}

/// Classifier output for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub confidence: f64,
}

impl Sentiment {
    #[must_use]
    pub fn neutral(confidence: f64) -> Self {
        Self {
            label: "neutral".to_string(),
            confidence,
        }
    }
}

/// An enriched mention ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMention {
    pub project_id: Uuid,
    pub source: String,
    /// First project keyword found in the text, empty for query-only matches.
    pub keyword_matched: String,
    pub title: String,
    pub text: String,
    pub author: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: Engagement,
    pub follower_count: i64,
    pub reach_estimate: i64,
    pub lang: String,
    pub geo: String,
    pub sentiment: Sentiment,
    pub similarity_hash: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

/// A persisted mention. Append-only: never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: Uuid,
    pub project_id: Uuid,
    pub source: String,
    pub keyword_matched: String,
    pub title: String,
    pub text: String,
    pub author: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: Engagement,
    pub follower_count: i64,
    pub reach_estimate: i64,
    pub lang: String,
    pub geo: String,
    pub sentiment: Sentiment,
    pub similarity_hash: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl Mention {
    #[must_use]
    pub fn from_new(id: Uuid, new: NewMention) -> Self {
        Self {
            id,
            project_id: new.project_id,
            source: new.source,
            keyword_matched: new.keyword_matched,
            title: new.title,
            text: new.text,
            author: new.author,
            url: new.url,
            published_at: new.published_at,
            engagement: new.engagement,
            follower_count: new.follower_count,
            reach_estimate: new.reach_estimate,
            lang: new.lang,
            geo: new.geo,
            sentiment: new.sentiment,
            similarity_hash: new.similarity_hash,
            ingested_at: new.ingested_at,
        }
    }
}
