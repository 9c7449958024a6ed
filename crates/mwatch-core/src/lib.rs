//! Domain types, plan limits, and configuration shared by every mwatch crate.

pub mod app_config;
pub mod config;
pub mod mentions;
pub mod plans;
pub mod projects;
pub mod records;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use mentions::{Engagement, Mention, NewMention, RawMention, Sentiment};
pub use plans::{plan_limits, PlanLimits, DEFAULT_PLAN};
pub use projects::{normalize_keywords, validate_project_settings, Project, ProjectStatus};
pub use records::{
    month_key, Account, Alert, AlertType, AuditEntry, AuditLevel, ConnectorHealth, HealthStatus,
    NewAlert, Usage,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid project status: {0}")]
    InvalidProjectStatus(String),

    #[error("invalid connector health status: {0}")]
    InvalidHealthStatus(String),

    #[error("invalid alert type: {0}")]
    InvalidAlertType(String),

    #[error("plan '{plan}' allows at most {limit} keywords, got {got}")]
    KeywordLimit {
        plan: String,
        limit: usize,
        got: usize,
    },

    #[error("schedule interval {got} min is outside the allowed range [{min}, {max}]")]
    ScheduleOutOfRange { got: i32, min: i32, max: i32 },
}
