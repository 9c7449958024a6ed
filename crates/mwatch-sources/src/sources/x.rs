//! X (Twitter) v2 recent-search connector.
//!
//! Returns an empty vec if no bearer token is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{Engagement, Project, RawMention};
use serde::Deserialize;

use crate::connector::{Connector, ConnectorCapabilities};
use crate::error::SourceError;
use crate::http::send_json;

pub const SOURCE: &str = "x";
const MAX_RESULTS: &str = "10";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<TweetMetrics>,
}

#[derive(Debug, Deserialize)]
struct TweetMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    reply_count: i64,
    #[serde(default)]
    retweet_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
    public_metrics: Option<UserMetrics>,
}

#[derive(Debug, Deserialize)]
struct UserMetrics {
    #[serde(default)]
    followers_count: i64,
}

pub struct XConnector {
    client: reqwest::Client,
    api_base: String,
    bearer_token: Option<String>,
}

impl XConnector {
    #[must_use]
    pub fn new(client: reqwest::Client, api_base: &str, bearer_token: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bearer_token,
        }
    }
}

fn to_mentions(response: SearchResponse) -> Vec<RawMention> {
    let users: HashMap<String, User> = response
        .includes
        .users
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    response
        .data
        .into_iter()
        .map(|tweet| {
            let user = tweet.author_id.as_ref().and_then(|id| users.get(id));
            let author = user
                .map(|u| u.username.clone())
                .or(tweet.author_id.clone())
                .unwrap_or_default();
            let follower_count = user
                .and_then(|u| u.public_metrics.as_ref())
                .map_or(0, |m| m.followers_count);
            let engagement = tweet
                .public_metrics
                .as_ref()
                .map_or_else(Engagement::default, |m| Engagement {
                    likes: m.like_count,
                    comments: m.reply_count,
                    shares: m.retweet_count,
                });

            RawMention {
                source: SOURCE.to_string(),
                title: String::new(),
                text: tweet.text,
                author,
                url: Some(format!("https://twitter.com/i/web/status/{}", tweet.id)),
                published_at: tweet.created_at,
                engagement,
                follower_count,
            }
        })
        .collect()
}

#[async_trait]
impl Connector for XConnector {
    fn id(&self) -> &'static str {
        "x"
    }

    fn display_name(&self) -> &'static str {
        "X (Twitter)"
    }

    fn enabled_by_default(&self) -> bool {
        false
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            realtime: false,
            search: true,
            limits: "Requires paid API access; v2 recent search only.",
        }
    }

    async fn fetch(
        &self,
        project: &Project,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        let Some(token) = self.bearer_token.as_deref() else {
            return Ok(vec![]);
        };

        let query = project.search_query();
        let mut params = vec![
            ("query", query),
            ("max_results", MAX_RESULTS.to_string()),
            (
                "tweet.fields",
                "created_at,author_id,public_metrics".to_string(),
            ),
            ("expansions", "author_id".to_string()),
            ("user.fields", "public_metrics".to_string()),
        ];
        // Recent search covers seven days; older start times are rejected.
        if let Some(since) = since.filter(|s| Utc::now() - *s < chrono::Duration::days(6)) {
            params.push((
                "start_time",
                since.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ));
        }

        let response: SearchResponse = send_json(
            self.client
                .get(format!("{}/tweets/search/recent", self.api_base))
                .bearer_auth(token)
                .query(&params),
            SOURCE,
        )
        .await?;

        Ok(to_mentions(response))
    }
}
