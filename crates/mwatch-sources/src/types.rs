use mwatch_core::AppConfig;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const REDDIT_BASE: &str = "https://www.reddit.com";
pub const X_API_BASE: &str = "https://api.twitter.com/2";
pub const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// One RSS or Atom feed polled by the local-news connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsFeed {
    pub name: String,
    pub url: String,
}

impl NewsFeed {
    #[must_use]
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// The default local-news feed list.
#[must_use]
pub fn default_news_feeds() -> Vec<NewsFeed> {
    vec![
        NewsFeed::new("OnlineKhabar", "https://www.onlinekhabar.com/rss"),
        NewsFeed::new("Kathmandu Post", "https://kathmandupost.com/rss"),
        NewsFeed::new("Setopati", "https://en.setopati.com/rss"),
    ]
}

/// Configuration shared by the connectors and the classifier.
///
/// Base URLs are fields so tests can point adapters at a mock server.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub classifier_url: Option<String>,
    pub news_feeds: Vec<NewsFeed>,
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub reddit_base: String,
    pub reddit_subreddits: Vec<String>,
    pub twitter_bearer_token: Option<String>,
    pub x_api_base: String,
    pub meta_access_token: Option<String>,
    pub meta_page_id: Option<String>,
    pub meta_ig_user_id: Option<String>,
    pub graph_api_base: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 15,
            user_agent: "mwatch/0.1 (mention-monitor)".to_string(),
            classifier_url: None,
            news_feeds: default_news_feeds(),
            youtube_api_key: None,
            youtube_api_base: YOUTUBE_API_BASE.to_string(),
            reddit_base: REDDIT_BASE.to_string(),
            reddit_subreddits: ["Nepal", "NepalPolitics", "Nepali", "NepalSocial"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            twitter_bearer_token: None,
            x_api_base: X_API_BASE.to_string(),
            meta_access_token: None,
            meta_page_id: None,
            meta_ig_user_id: None,
            graph_api_base: GRAPH_API_BASE.to_string(),
        }
    }
}

impl SourcesConfig {
    /// Take credentials, timeouts and the classifier endpoint from the
    /// application config; feed lists and API bases keep their defaults.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            http_timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            classifier_url: config.classifier_url.clone(),
            youtube_api_key: config.youtube_api_key.clone(),
            twitter_bearer_token: config.twitter_bearer_token.clone(),
            meta_access_token: config.meta_access_token.clone(),
            meta_page_id: config.meta_page_id.clone(),
            meta_ig_user_id: config.meta_ig_user_id.clone(),
            ..Self::default()
        }
    }
}
