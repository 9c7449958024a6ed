use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Db(#[from] mwatch_db::DbError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("store unavailable: {0}")]
    Store(String),

    #[error(transparent)]
    Source(#[from] mwatch_sources::SourceError),
}
