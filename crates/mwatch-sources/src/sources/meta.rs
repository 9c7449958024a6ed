//! Meta Graph API connector for owned assets: a Facebook page's posts (and
//! their comments) and an Instagram business account's media.
//!
//! The Graph API has no global keyword search, so posts are filtered locally
//! against the project's keywords.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mwatch_core::{Engagement, Project, RawMention};
use serde::Deserialize;

use crate::connector::{Connector, ConnectorCapabilities};
use crate::error::SourceError;
use crate::http::send_json;

pub const FACEBOOK_SOURCE: &str = "facebook";
pub const INSTAGRAM_SOURCE: &str = "instagram";

const POST_FIELDS: &str = "id,message,created_time,permalink_url,shares,\
    reactions.summary(true),comments.summary(true){id,message,created_time,from,like_count}";
const MEDIA_FIELDS: &str = "id,caption,timestamp,permalink,like_count,comments_count,media_type";
const PAGE_LIMIT: &str = "50";
const LOOKBACK_DAYS: i64 = 7;
const TITLE_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    total_count: i64,
}

#[derive(Debug, Deserialize)]
struct Summarized<T> {
    summary: Option<Summary>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Shares {
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct FacebookPost {
    id: String,
    #[serde(default)]
    message: String,
    created_time: Option<String>,
    permalink_url: Option<String>,
    shares: Option<Shares>,
    reactions: Option<Summarized<serde_json::Value>>,
    comments: Option<Summarized<FacebookComment>>,
}

#[derive(Debug, Deserialize)]
struct FacebookComment {
    #[serde(default)]
    message: String,
    created_time: Option<String>,
    from: Option<CommentAuthor>,
    #[serde(default)]
    like_count: i64,
}

#[derive(Debug, Deserialize)]
struct CommentAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct InstagramMedia {
    id: String,
    #[serde(default)]
    caption: String,
    timestamp: Option<String>,
    permalink: Option<String>,
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    comments_count: i64,
}

/// Graph timestamps look like `2026-03-03T04:30:00+0000`.
fn parse_graph_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn title_of(text: &str) -> String {
    if text.chars().count() > TITLE_CHARS {
        let head: String = text.chars().take(TITLE_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// True when no keywords are configured or any keyword occurs in `text`.
fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

fn facebook_mentions(posts: Vec<FacebookPost>, keywords: &[String]) -> Vec<RawMention> {
    let mut mentions = Vec::new();
    for post in posts {
        if matches_keywords(&post.message, keywords) {
            let url = post
                .permalink_url
                .clone()
                .unwrap_or_else(|| format!("https://facebook.com/{}", post.id));
            mentions.push(RawMention {
                source: FACEBOOK_SOURCE.to_string(),
                title: title_of(&post.message),
                text: post.message.clone(),
                author: "Page Post".to_string(),
                url: Some(url),
                published_at: parse_graph_time(post.created_time.as_deref()),
                engagement: Engagement {
                    likes: post
                        .reactions
                        .as_ref()
                        .and_then(|r| r.summary.as_ref())
                        .map_or(0, |s| s.total_count),
                    comments: post
                        .comments
                        .as_ref()
                        .and_then(|c| c.summary.as_ref())
                        .map_or(0, |s| s.total_count),
                    shares: post.shares.as_ref().map_or(0, |s| s.count),
                },
                follower_count: 0,
            });
        }

        for comment in post.comments.map(|c| c.data).unwrap_or_default() {
            if !matches_keywords(&comment.message, keywords) {
                continue;
            }
            // No URL: comments would otherwise collide with their post on
            // the (project, source, url) key.
            mentions.push(RawMention {
                source: FACEBOOK_SOURCE.to_string(),
                title: "Comment on post".to_string(),
                text: comment.message,
                author: comment
                    .from
                    .map_or_else(|| "Unknown".to_string(), |f| f.name),
                url: None,
                published_at: parse_graph_time(comment.created_time.as_deref()),
                engagement: Engagement {
                    likes: comment.like_count,
                    comments: 0,
                    shares: 0,
                },
                follower_count: 0,
            });
        }
    }
    mentions
}

fn instagram_mentions(media: Vec<InstagramMedia>, keywords: &[String]) -> Vec<RawMention> {
    media
        .into_iter()
        .filter(|item| matches_keywords(&item.caption, keywords))
        .map(|item| RawMention {
            source: INSTAGRAM_SOURCE.to_string(),
            title: title_of(&item.caption),
            url: Some(
                item.permalink
                    .unwrap_or_else(|| format!("https://instagram.com/p/{}", item.id)),
            ),
            published_at: parse_graph_time(item.timestamp.as_deref()),
            text: item.caption,
            author: "Instagram Post".to_string(),
            engagement: Engagement {
                likes: item.like_count,
                comments: item.comments_count,
                shares: 0,
            },
            follower_count: 0,
        })
        .collect()
}

pub struct MetaConnector {
    client: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
    page_id: Option<String>,
    ig_user_id: Option<String>,
}

impl MetaConnector {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        access_token: Option<String>,
        page_id: Option<String>,
        ig_user_id: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
            page_id,
            ig_user_id,
        }
    }

    async fn page_posts(
        &self,
        token: &str,
        page_id: &str,
    ) -> Result<Vec<FacebookPost>, SourceError> {
        let since = (Utc::now() - Duration::days(LOOKBACK_DAYS))
            .timestamp()
            .to_string();
        let page: Page<FacebookPost> = send_json(
            self.client
                .get(format!("{}/{page_id}/posts", self.api_base))
                .query(&[
                    ("fields", POST_FIELDS),
                    ("limit", PAGE_LIMIT),
                    ("since", since.as_str()),
                    ("access_token", token),
                ]),
            FACEBOOK_SOURCE,
        )
        .await?;
        Ok(page.data)
    }

    async fn instagram_media(
        &self,
        token: &str,
        ig_user_id: &str,
    ) -> Result<Vec<InstagramMedia>, SourceError> {
        let page: Page<InstagramMedia> = send_json(
            self.client
                .get(format!("{}/{ig_user_id}/media", self.api_base))
                .query(&[
                    ("fields", MEDIA_FIELDS),
                    ("limit", PAGE_LIMIT),
                    ("access_token", token),
                ]),
            INSTAGRAM_SOURCE,
        )
        .await?;
        Ok(page.data)
    }
}

#[async_trait]
impl Connector for MetaConnector {
    fn id(&self) -> &'static str {
        "meta"
    }

    fn display_name(&self) -> &'static str {
        "Meta (Owned Assets Only)"
    }

    fn enabled_by_default(&self) -> bool {
        false
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            realtime: false,
            search: false,
            limits: "Owned pages/IG business accounts only; no global keyword search.",
        }
    }

    /// Fetch the page and Instagram assets that are configured. A failing
    /// asset is logged and skipped; the call fails only when nothing was
    /// collected and an asset failed.
    async fn fetch(
        &self,
        project: &Project,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(vec![]);
        };

        let mut mentions = Vec::new();
        let mut last_error = None;

        if let Some(page_id) = self.page_id.as_deref() {
            match self.page_posts(token, page_id).await {
                Ok(posts) => mentions.extend(facebook_mentions(posts, &project.keywords)),
                Err(e) => {
                    tracing::warn!(source = FACEBOOK_SOURCE, error = %e, "page posts fetch failed");
                    last_error = Some(e);
                }
            }
        }

        if let Some(ig_user_id) = self.ig_user_id.as_deref() {
            match self.instagram_media(token, ig_user_id).await {
                Ok(media) => mentions.extend(instagram_mentions(media, &project.keywords)),
                Err(e) => {
                    tracing::warn!(source = INSTAGRAM_SOURCE, error = %e, "media fetch failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if mentions.is_empty() => Err(e),
            _ => Ok(mentions),
        }
    }
}
