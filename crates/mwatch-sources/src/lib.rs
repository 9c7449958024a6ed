//! Mention sources for mwatch.
//!
//! Defines the [`Connector`] contract, the ordered [`ConnectorRegistry`] of
//! upstream adapters (local news feeds, YouTube, Reddit, X, Meta, plus the
//! unsupported TikTok and Viber placeholders), and the text classifier used to
//! tag mentions with sentiment and language.

pub mod classifier;
pub mod connector;
pub mod error;
pub mod http;
pub mod language;
pub mod registry;
pub mod scorer;
pub mod sources;
pub mod types;

pub use classifier::{classifier_from_config, HttpClassifier, LexiconClassifier, TextClassifier};
pub use connector::{Connector, ConnectorCapabilities, ConnectorDescriptor};
pub use error::SourceError;
pub use language::detect_language;
pub use registry::{default_registry, ConnectorRegistry};
pub use scorer::lexicon_score;
pub use types::{NewsFeed, SourcesConfig};
