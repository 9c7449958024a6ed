//! The mention ingestion and alerting engine.
//!
//! [`IngestionOrchestrator`] runs one project's pass against the
//! [`ConnectorRegistry`](mwatch_sources::ConnectorRegistry), [`AlertEngine`]
//! evaluates thresholds over what was persisted, and [`Scheduler`] drives
//! both on a recurring tick. Persistence goes through [`IngestStore`].

pub mod alerts;
pub mod error;
pub mod fingerprint;
pub mod health;
pub mod ingest;
pub mod memory;
pub mod notify;
pub mod query;
pub mod quota;
pub mod reach;
pub mod scheduler;
pub mod setup;
pub mod store;

pub use alerts::{
    AlertEngine, AlertThresholds, CheckReport, InfluencerThresholds, ReachThresholds,
    SentimentShare, SentimentThresholds, VolumeThresholds,
};
pub use error::EngineError;
pub use fingerprint::fingerprint;
pub use ingest::{
    relevance, ConnectorOutcome, ConnectorReport, IngestOptions, IngestOutcome,
    IngestionOrchestrator, SkipReason,
};
pub use memory::MemoryStore;
pub use notify::{
    BroadcastPublisher, EmailSender, HttpEmailSender, NoopEmailSender, RealtimeEvent,
    RealtimePublisher,
};
pub use quota::{is_over_limit, QuotaLedger};
pub use reach::{EngagementField, ReachEstimator};
pub use scheduler::{Scheduler, SchedulerConfig, TickSummary};
pub use setup::{build_engine, Engine};
pub use store::{IngestStore, PgStore};
