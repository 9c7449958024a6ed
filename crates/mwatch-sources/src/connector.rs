//! The adapter contract every source implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mwatch_core::{Project, RawMention};
use serde::Serialize;

use crate::error::SourceError;

/// What a connector can do, shown to operators when choosing sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectorCapabilities {
    pub realtime: bool,
    pub search: bool,
    /// Free-text note on what the source cannot do.
    pub limits: &'static str,
}

/// A named data source that turns a project into raw mention candidates.
///
/// Adapters that lack credentials return `Ok(vec![])`; missing credentials
/// are not a failure.
#[async_trait]
pub trait Connector: Send + Sync {
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn enabled_by_default(&self) -> bool;

    fn capabilities(&self) -> ConnectorCapabilities;

    /// Fetch candidates for `project`. `since` is the project's previous run,
    /// which adapters may use to narrow the upstream query.
    async fn fetch(
        &self,
        project: &Project,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawMention>, SourceError>;
}

/// Serializable summary of a registered connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub enabled_by_default: bool,
    pub capabilities: ConnectorCapabilities,
}

impl ConnectorDescriptor {
    #[must_use]
    pub fn of(connector: &dyn Connector) -> Self {
        Self {
            id: connector.id(),
            display_name: connector.display_name(),
            enabled_by_default: connector.enabled_by_default(),
            capabilities: connector.capabilities(),
        }
    }
}
