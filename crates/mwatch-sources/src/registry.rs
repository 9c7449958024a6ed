//! The fixed, ordered set of connectors.

use std::sync::Arc;

use mwatch_core::Project;

use crate::connector::{Connector, ConnectorDescriptor};
use crate::error::SourceError;
use crate::http::build_client;
use crate::sources::{
    LocalNewsConnector, MetaConnector, RedditConnector, UnsupportedConnector, XConnector,
    YoutubeConnector,
};
use crate::types::SourcesConfig;

/// Connectors in run order. Order is preserved by every accessor.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: Vec<Arc<dyn Connector>>,
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.connectors.iter().map(|c| c.id()))
            .finish()
    }
}

impl ConnectorRegistry {
    #[must_use]
    pub fn new(connectors: Vec<Arc<dyn Connector>>) -> Self {
        Self { connectors }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Connector>> {
        self.connectors.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Connector>> {
        self.connectors.iter().find(|c| c.id() == id)
    }

    /// Connectors that run for `project`: its explicit per-connector flag
    /// wins, otherwise the connector's own default applies.
    #[must_use]
    pub fn enabled_for(&self, project: &Project) -> Vec<Arc<dyn Connector>> {
        self.connectors
            .iter()
            .filter(|c| project.source_enabled(c.id(), c.enabled_by_default()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<ConnectorDescriptor> {
        self.connectors
            .iter()
            .map(|c| ConnectorDescriptor::of(c.as_ref()))
            .collect()
    }
}

/// Build the standard registry: localNews, youtube, reddit, x, meta,
/// tiktok, viber.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the shared HTTP client cannot be built.
pub fn default_registry(config: &SourcesConfig) -> Result<ConnectorRegistry, SourceError> {
    let client = build_client(config)?;

    let connectors: Vec<Arc<dyn Connector>> = vec![
        Arc::new(LocalNewsConnector::new(
            client.clone(),
            config.news_feeds.clone(),
        )),
        Arc::new(YoutubeConnector::new(
            client.clone(),
            &config.youtube_api_base,
            config.youtube_api_key.clone(),
        )),
        Arc::new(RedditConnector::new(
            client.clone(),
            &config.reddit_base,
            config.reddit_subreddits.clone(),
        )),
        Arc::new(XConnector::new(
            client.clone(),
            &config.x_api_base,
            config.twitter_bearer_token.clone(),
        )),
        Arc::new(MetaConnector::new(
            client,
            &config.graph_api_base,
            config.meta_access_token.clone(),
            config.meta_page_id.clone(),
            config.meta_ig_user_id.clone(),
        )),
        Arc::new(UnsupportedConnector::tiktok()),
        Arc::new(UnsupportedConnector::viber()),
    ];

    Ok(ConnectorRegistry::new(connectors))
}
