//! Database operations for the append-only `mentions` table.

use chrono::{DateTime, Utc};
use mwatch_core::{Engagement, Mention, NewMention, Sentiment};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const MENTION_COLUMNS: &str = "id, project_id, source, keyword_matched, title, body, author, url, \
     published_at, likes, comments, shares, follower_count, reach_estimate, lang, geo, \
     sentiment_label, sentiment_confidence, similarity_hash, ingested_at";

/// A row from the `mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub source: String,
    pub keyword_matched: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub follower_count: i64,
    pub reach_estimate: i64,
    pub lang: String,
    pub geo: String,
    pub sentiment_label: String,
    pub sentiment_confidence: f64,
    pub similarity_hash: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl From<MentionRow> for Mention {
    fn from(row: MentionRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            source: row.source,
            keyword_matched: row.keyword_matched,
            title: row.title,
            text: row.body,
            author: row.author,
            url: row.url,
            published_at: row.published_at,
            engagement: Engagement {
                likes: row.likes,
                comments: row.comments,
                shares: row.shares,
            },
            follower_count: row.follower_count,
            reach_estimate: row.reach_estimate,
            lang: row.lang,
            geo: row.geo,
            sentiment: Sentiment {
                label: row.sentiment_label,
                confidence: row.sentiment_confidence,
            },
            similarity_hash: row.similarity_hash,
            ingested_at: row.ingested_at,
        }
    }
}

/// Insert a batch of mentions, skipping any row that violates either dedup
/// index (`(project_id, source, url)` or `(project_id, similarity_hash)`).
///
/// Returns the newly inserted rows. Skipped duplicates, including duplicates
/// within the batch itself, are absent from the result and never raise an
/// error. Uses a single `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT DO
/// NOTHING` so the whole batch is one round-trip.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] for any failure other than a dedup conflict.
pub async fn insert_mentions(
    pool: &PgPool,
    mentions: &[NewMention],
) -> Result<Vec<Mention>, DbError> {
    if mentions.is_empty() {
        return Ok(Vec::new());
    }

    let n = mentions.len();
    let mut ids: Vec<Uuid> = Vec::with_capacity(n);
    let mut project_ids: Vec<Uuid> = Vec::with_capacity(n);
    let mut sources: Vec<String> = Vec::with_capacity(n);
    let mut keywords: Vec<String> = Vec::with_capacity(n);
    let mut titles: Vec<String> = Vec::with_capacity(n);
    let mut bodies: Vec<String> = Vec::with_capacity(n);
    let mut authors: Vec<String> = Vec::with_capacity(n);
    let mut urls: Vec<Option<String>> = Vec::with_capacity(n);
    let mut published: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(n);
    let mut likes: Vec<i64> = Vec::with_capacity(n);
    let mut comments: Vec<i64> = Vec::with_capacity(n);
    let mut shares: Vec<i64> = Vec::with_capacity(n);
    let mut followers: Vec<i64> = Vec::with_capacity(n);
    let mut reach: Vec<i64> = Vec::with_capacity(n);
    let mut langs: Vec<String> = Vec::with_capacity(n);
    let mut geos: Vec<String> = Vec::with_capacity(n);
    let mut labels: Vec<String> = Vec::with_capacity(n);
    let mut confidences: Vec<f64> = Vec::with_capacity(n);
    let mut hashes: Vec<Option<String>> = Vec::with_capacity(n);
    let mut ingested: Vec<DateTime<Utc>> = Vec::with_capacity(n);

    for m in mentions {
        ids.push(Uuid::new_v4());
        project_ids.push(m.project_id);
        sources.push(m.source.clone());
        keywords.push(m.keyword_matched.clone());
        titles.push(m.title.clone());
        bodies.push(m.text.clone());
        authors.push(m.author.clone());
        urls.push(m.url.clone());
        published.push(m.published_at);
        likes.push(m.engagement.likes);
        comments.push(m.engagement.comments);
        shares.push(m.engagement.shares);
        followers.push(m.follower_count);
        reach.push(m.reach_estimate);
        langs.push(m.lang.clone());
        geos.push(m.geo.clone());
        labels.push(m.sentiment.label.clone());
        confidences.push(m.sentiment.confidence);
        hashes.push(m.similarity_hash.clone());
        ingested.push(m.ingested_at);
    }

    let rows = sqlx::query_as::<_, MentionRow>(&format!(
        "INSERT INTO mentions ({MENTION_COLUMNS}) \
         SELECT * FROM UNNEST(\
              $1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::text[], $8::text[], $9::timestamptz[], $10::int8[], $11::int8[], \
              $12::int8[], $13::int8[], $14::int8[], $15::text[], $16::text[], \
              $17::text[], $18::float8[], $19::text[], $20::timestamptz[]) \
         ON CONFLICT DO NOTHING \
         RETURNING {MENTION_COLUMNS}"
    ))
    .bind(&ids)
    .bind(&project_ids)
    .bind(&sources)
    .bind(&keywords)
    .bind(&titles)
    .bind(&bodies)
    .bind(&authors)
    .bind(&urls)
    .bind(&published)
    .bind(&likes)
    .bind(&comments)
    .bind(&shares)
    .bind(&followers)
    .bind(&reach)
    .bind(&langs)
    .bind(&geos)
    .bind(&labels)
    .bind(&confidences)
    .bind(&hashes)
    .bind(&ingested)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Mention::from).collect())
}

/// Count a project's mentions ingested in `[from, to)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_mentions_between(
    pool: &PgPool,
    project_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM mentions \
         WHERE project_id = $1 AND ingested_at >= $2 AND ingested_at < $3",
    )
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List a project's mentions ingested in `[from, to)`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mentions_between(
    pool: &PgPool,
    project_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<Mention>, DbError> {
    let rows = sqlx::query_as::<_, MentionRow>(&format!(
        "SELECT {MENTION_COLUMNS} FROM mentions \
         WHERE project_id = $1 AND ingested_at >= $2 AND ingested_at < $3 \
         ORDER BY ingested_at DESC, id \
         LIMIT $4"
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Mention::from).collect())
}

/// Sum `reach_estimate` over a project's mentions ingested in `[from, to)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sum_reach_between(
    pool: &PgPool,
    project_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, DbError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(reach_estimate), 0)::int8 FROM mentions \
         WHERE project_id = $1 AND ingested_at >= $2 AND ingested_at < $3",
    )
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(total)
}
