//! YouTube Data API v3 connector: keyword search, then a statistics lookup
//! for the returned videos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{Engagement, Project, RawMention};
use serde::Deserialize;

use crate::connector::{Connector, ConnectorCapabilities};
use crate::error::SourceError;
use crate::http::send_json;

pub const SOURCE: &str = "youtube";
const MAX_RESULTS: &str = "5";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<DateTime<Utc>>,
}

/// The API reports counters as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    like_count: Option<String>,
    comment_count: Option<String>,
}

fn count(raw: Option<&String>) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

impl From<Video> for RawMention {
    fn from(video: Video) -> Self {
        Self {
            source: SOURCE.to_string(),
            title: video.snippet.title,
            text: video.snippet.description,
            author: video.snippet.channel_title,
            url: Some(format!("https://www.youtube.com/watch?v={}", video.id)),
            published_at: video.snippet.published_at,
            engagement: Engagement {
                likes: count(video.statistics.like_count.as_ref()),
                comments: count(video.statistics.comment_count.as_ref()),
                shares: 0,
            },
            follower_count: 0,
        }
    }
}

pub struct YoutubeConnector {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl YoutubeConnector {
    #[must_use]
    pub fn new(client: reqwest::Client, api_base: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Connector for YoutubeConnector {
    fn id(&self) -> &'static str {
        "youtube"
    }

    fn display_name(&self) -> &'static str {
        "YouTube"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            realtime: false,
            search: true,
            limits: "Requires API key; comments limited to top threads.",
        }
    }

    async fn fetch(
        &self,
        project: &Project,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(vec![]);
        };

        let query = project.search_query();
        let search: SearchResponse = send_json(
            self.client
                .get(format!("{}/search", self.api_base))
                .query(&[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", MAX_RESULTS),
                    ("q", query.as_str()),
                    ("key", api_key),
                ]),
            SOURCE,
        )
        .await?;

        let video_ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();
        if video_ids.is_empty() {
            return Ok(vec![]);
        }

        let ids = video_ids.join(",");
        let videos: VideosResponse = send_json(
            self.client
                .get(format!("{}/videos", self.api_base))
                .query(&[
                    ("part", "snippet,statistics"),
                    ("id", ids.as_str()),
                    ("key", api_key),
                ]),
            SOURCE,
        )
        .await?;

        Ok(videos.items.into_iter().map(RawMention::from).collect())
    }
}
