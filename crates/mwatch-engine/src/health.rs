//! Per (project, connector) health, recomputed from each run's outcome.
//!
//! There is no memory across runs: the latest attempt overwrites the record.

use chrono::{DateTime, Utc};
use mwatch_core::{ConnectorHealth, HealthStatus};
use uuid::Uuid;

/// What one connector attempt produced, as far as health is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt<'a> {
    /// The fetch succeeded and `persisted` mentions were inserted from it.
    Completed { persisted: usize },
    /// The fetch failed or timed out.
    Failed { error: &'a str },
}

#[must_use]
pub fn status_for(attempt: Attempt<'_>) -> HealthStatus {
    match attempt {
        Attempt::Completed { persisted: 0 } => HealthStatus::NoData,
        Attempt::Completed { .. } => HealthStatus::Ok,
        Attempt::Failed { .. } => HealthStatus::Degraded,
    }
}

/// The record to upsert after one attempt.
#[must_use]
pub fn assess(
    project_id: Uuid,
    connector_id: &str,
    attempt: Attempt<'_>,
    now: DateTime<Utc>,
) -> ConnectorHealth {
    let last_error = match attempt {
        Attempt::Failed { error } => error.to_string(),
        Attempt::Completed { .. } => String::new(),
    };
    ConnectorHealth {
        project_id,
        connector_id: connector_id.to_string(),
        status: status_for(attempt),
        last_error,
        last_checked_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_mentions_mean_ok() {
        assert_eq!(
            status_for(Attempt::Completed { persisted: 3 }),
            HealthStatus::Ok
        );
    }

    #[test]
    fn zero_persisted_means_no_data() {
        assert_eq!(
            status_for(Attempt::Completed { persisted: 0 }),
            HealthStatus::NoData
        );
    }

    #[test]
    fn failure_is_degraded_with_error_text() {
        let now = Utc::now();
        let health = assess(
            Uuid::nil(),
            "youtube",
            Attempt::Failed {
                error: "timed out after 25s",
            },
            now,
        );
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.last_error, "timed out after 25s");
        assert_eq!(health.last_checked_at, now);
    }

    #[test]
    fn success_clears_previous_error() {
        let health = assess(
            Uuid::nil(),
            "reddit",
            Attempt::Completed { persisted: 1 },
            Utc::now(),
        );
        assert!(health.last_error.is_empty());
    }
}
