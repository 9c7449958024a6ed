//! Reddit connector over the public search JSON endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{Engagement, Project, RawMention};
use serde::Deserialize;

use crate::connector::{Connector, ConnectorCapabilities};
use crate::error::SourceError;
use crate::http::send_json;

pub const SOURCE: &str = "reddit";
const POSTS_LIMIT: &str = "10";

/// Reddit search listing wrapper.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}

#[derive(Debug, Default, Deserialize)]
struct PostData {
    title: Option<String>,
    selftext: Option<String>,
    author: Option<String>,
    permalink: Option<String>,
    created_utc: Option<f64>,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    num_comments: i64,
}

#[allow(clippy::cast_possible_truncation)]
fn to_mention(post: PostData) -> RawMention {
    let published_at = post
        .created_utc
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));
    let body = post
        .selftext
        .filter(|body| body != "[deleted]" && body != "[removed]")
        .unwrap_or_default();

    RawMention {
        source: SOURCE.to_string(),
        title: post.title.unwrap_or_default(),
        text: body,
        author: post.author.unwrap_or_default(),
        url: Some(format!(
            "https://www.reddit.com{}",
            post.permalink.unwrap_or_default()
        )),
        published_at,
        engagement: Engagement {
            likes: post.ups,
            comments: post.num_comments,
            shares: 0,
        },
        follower_count: 0,
    }
}

pub struct RedditConnector {
    client: reqwest::Client,
    base: String,
    subreddits: Vec<String>,
}

impl RedditConnector {
    #[must_use]
    pub fn new(client: reqwest::Client, base: &str, subreddits: Vec<String>) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            subreddits,
        }
    }
}

#[async_trait]
impl Connector for RedditConnector {
    fn id(&self) -> &'static str {
        "reddit"
    }

    fn display_name(&self) -> &'static str {
        "Reddit (r/Nepal)"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            realtime: false,
            search: true,
            limits: "Public search JSON; no private communities.",
        }
    }

    /// Search each configured subreddit in turn. Any failing subreddit fails
    /// the whole fetch.
    async fn fetch(
        &self,
        project: &Project,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        let query = project.search_query();
        let mut mentions = Vec::new();

        for subreddit in &self.subreddits {
            let listing: Listing = send_json(
                self.client
                    .get(format!("{}/r/{subreddit}/search.json", self.base))
                    .query(&[
                        ("q", query.as_str()),
                        ("restrict_sr", "1"),
                        ("sort", "new"),
                        ("limit", POSTS_LIMIT),
                    ]),
                SOURCE,
            )
            .await?;

            mentions.extend(
                listing
                    .data
                    .children
                    .into_iter()
                    .map(|post| to_mention(post.data)),
            );
        }

        Ok(mentions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn post_maps_to_raw_mention() {
        let post = PostData {
            title: Some("Budget debate".to_string()),
            selftext: Some("[removed]".to_string()),
            author: Some("someone".to_string()),
            permalink: Some("/r/Nepal/comments/abc/budget_debate/".to_string()),
            created_utc: Some(1_772_500_000.0),
            ups: 40,
            num_comments: 12,
        };

        let mention = to_mention(post);
        assert_eq!(mention.source, "reddit");
        assert_eq!(mention.text, "");
        assert_eq!(
            mention.url.as_deref(),
            Some("https://www.reddit.com/r/Nepal/comments/abc/budget_debate/")
        );
        assert_eq!(mention.engagement.comments, 12);
        assert_eq!(
            mention.published_at,
            Some(Utc.timestamp_opt(1_772_500_000, 0).unwrap())
        );
    }
}
