//! Monthly mention quota, shared by all of an account's projects.

use mwatch_core::{PlanLimits, Usage};
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::IngestStore;

/// `true` once the month's count has reached the plan ceiling.
#[must_use]
pub fn is_over_limit(plan: &PlanLimits, usage: &Usage) -> bool {
    usage.mentions_count >= plan.mentions_per_month
}

/// Ledger operations bound to a store.
pub struct QuotaLedger<'a> {
    store: &'a dyn IngestStore,
}

impl<'a> QuotaLedger<'a> {
    #[must_use]
    pub fn new(store: &'a dyn IngestStore) -> Self {
        Self { store }
    }

    /// Fetch the month's record, creating a zero-count one if absent.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn ensure(&self, account_id: Uuid, month: &str) -> Result<Usage, EngineError> {
        self.store.ensure_usage(account_id, month).await
    }

    /// Add `count` newly persisted mentions to the month.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn record(&self, account_id: Uuid, month: &str, count: i64) -> Result<(), EngineError> {
        if count <= 0 {
            return Ok(());
        }
        self.store.increment_usage(account_id, month, count).await
    }
}
