use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{source_id} API returned status {status}: {body}")]
    Api {
        source_id: &'static str,
        status: u16,
        body: String,
    },

    #[error("{source_id} response parse error: {reason}")]
    Parse {
        source_id: &'static str,
        reason: String,
    },

    #[error("all {count} feeds failed; first error: {first}")]
    AllFeedsFailed { count: usize, first: String },

    #[error("{0}")]
    NotImplemented(&'static str),

    #[error("classifier error: {0}")]
    Classifier(String),
}
