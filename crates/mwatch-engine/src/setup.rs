//! Assemble the engine from [`AppConfig`] over a Postgres pool.

use std::sync::Arc;
use std::time::Duration;

use mwatch_core::AppConfig;
use mwatch_sources::{classifier_from_config, default_registry, http::build_client, SourcesConfig};
use sqlx::PgPool;

use crate::alerts::AlertEngine;
use crate::error::EngineError;
use crate::ingest::IngestionOrchestrator;
use crate::notify::{BroadcastPublisher, EmailSender, HttpEmailSender, NoopEmailSender};
use crate::store::PgStore;

/// A wired orchestrator plus the realtime channel its alerts publish to.
pub struct Engine {
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub realtime: Arc<BroadcastPublisher>,
}

/// Build the production engine: [`PgStore`], the default connector registry,
/// the configured classifier and the alert channels.
///
/// # Errors
///
/// Returns [`EngineError::Source`] if an HTTP client cannot be built.
pub fn build_engine(config: &AppConfig, pool: PgPool) -> Result<Engine, EngineError> {
    let sources = SourcesConfig::from_app_config(config);
    let registry = default_registry(&sources)?;
    let classifier = classifier_from_config(&sources)?;
    let store = Arc::new(PgStore::new(pool));
    let realtime = Arc::new(BroadcastPublisher::new());

    let email = email_sender(config, &sources)?;
    let mut alerts = AlertEngine::new(store.clone(), realtime.clone(), email);
    if config.alert_email_enabled {
        alerts = alerts.with_email(&config.dashboard_url);
    }

    let orchestrator = IngestionOrchestrator::new(store, registry, classifier, Arc::new(alerts))
        .with_connector_timeout(Duration::from_secs(config.connector_timeout_secs));

    Ok(Engine {
        orchestrator: Arc::new(orchestrator),
        realtime,
    })
}

fn email_sender(
    config: &AppConfig,
    sources: &SourcesConfig,
) -> Result<Arc<dyn EmailSender>, EngineError> {
    match (&config.email_api_url, &config.email_api_key, &config.email_from) {
        (Some(url), Some(key), Some(from)) => Ok(Arc::new(HttpEmailSender::new(
            build_client(sources)?,
            url.clone(),
            key.clone(),
            from.clone(),
        ))),
        _ => {
            if config.alert_email_enabled {
                tracing::warn!("alert email enabled but mail relay is not fully configured");
            }
            Ok(Arc::new(NoopEmailSender))
        }
    }
}
