//! Connectors that are registered but have no working ingestion path.
//! Every fetch fails, which surfaces as `degraded` health when a project
//! enables one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{Project, RawMention};

use crate::connector::{Connector, ConnectorCapabilities};
use crate::error::SourceError;

pub struct UnsupportedConnector {
    id: &'static str,
    display_name: &'static str,
    capabilities: ConnectorCapabilities,
    reason: &'static str,
}

impl UnsupportedConnector {
    #[must_use]
    pub fn tiktok() -> Self {
        Self {
            id: "tiktok",
            display_name: "TikTok (Experimental)",
            capabilities: ConnectorCapabilities {
                realtime: false,
                search: true,
                limits: "Experimental scraping; best-effort only.",
            },
            reason: "TikTok scraping not implemented",
        }
    }

    #[must_use]
    pub fn viber() -> Self {
        Self {
            id: "viber",
            display_name: "Viber Bot Channels",
            capabilities: ConnectorCapabilities {
                realtime: true,
                search: false,
                limits: "Bot-only channels; no global search.",
            },
            reason: "Viber bot ingestion not configured",
        }
    }
}

#[async_trait]
impl Connector for UnsupportedConnector {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.display_name
    }

    fn enabled_by_default(&self) -> bool {
        false
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        self.capabilities
    }

    async fn fetch(
        &self,
        _project: &Project,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError> {
        Err(SourceError::NotImplemented(self.reason))
    }
}
