//! Static plan table.

/// Limits attached to a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub keyword_limit: usize,
    pub mentions_per_month: i64,
    pub min_interval_minutes: i32,
}

/// Plan applied to accounts whose plan name is not in the table.
pub const DEFAULT_PLAN: &str = "individual";

const PLANS: &[(&str, PlanLimits)] = &[
    (
        "individual",
        PlanLimits {
            keyword_limit: 3,
            mentions_per_month: 3_000,
            min_interval_minutes: 30,
        },
    ),
    (
        "team",
        PlanLimits {
            keyword_limit: 7,
            mentions_per_month: 20_000,
            min_interval_minutes: 10,
        },
    ),
    (
        "pro",
        PlanLimits {
            keyword_limit: 15,
            mentions_per_month: 100_000,
            min_interval_minutes: 5,
        },
    ),
];

/// Look up the limits for `plan`. Unknown names get the most restrictive plan.
#[must_use]
pub fn plan_limits(plan: &str) -> PlanLimits {
    PLANS
        .iter()
        .find(|(name, _)| *name == plan)
        .or_else(|| PLANS.iter().find(|(name, _)| *name == DEFAULT_PLAN))
        .map_or(PLANS[0].1, |(_, limits)| *limits)
}
