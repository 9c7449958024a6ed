//! Approximate audience reach.
//!
//! Reach is a coarse per-source heuristic, not a measured metric: a reported
//! follower count wins, otherwise one engagement counter is scaled by a
//! per-source factor, otherwise zero.

use mwatch_core::{Engagement, RawMention};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementField {
    Likes,
    Comments,
    Shares,
}

impl EngagementField {
    fn read(self, engagement: &Engagement) -> i64 {
        match self {
            Self::Likes => engagement.likes,
            Self::Comments => engagement.comments,
            Self::Shares => engagement.shares,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachRule {
    pub field: EngagementField,
    pub factor: i64,
}

#[derive(Debug, Clone)]
pub struct ReachEstimator {
    rules: Vec<(String, ReachRule)>,
}

impl Default for ReachEstimator {
    fn default() -> Self {
        Self::empty()
            .with_rule("youtube", EngagementField::Likes, 10)
            .with_rule("reddit", EngagementField::Comments, 5)
            .with_rule("instagram", EngagementField::Likes, 10)
    }
}

impl ReachEstimator {
    /// An estimator with no per-source rules.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace the multiplier for `source`.
    #[must_use]
    pub fn with_rule(mut self, source: &str, field: EngagementField, factor: i64) -> Self {
        let rule = ReachRule { field, factor };
        match self.rules.iter_mut().find(|(s, _)| s == source) {
            Some(existing) => existing.1 = rule,
            None => self.rules.push((source.to_string(), rule)),
        }
        self
    }

    #[must_use]
    pub fn rule_for(&self, source: &str) -> Option<ReachRule> {
        self.rules
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, rule)| *rule)
    }

    /// Estimated reach of `raw`, never negative.
    #[must_use]
    pub fn estimate(&self, raw: &RawMention) -> i64 {
        if raw.follower_count > 0 {
            return raw.follower_count;
        }
        self.rule_for(&raw.source).map_or(0, |rule| {
            rule.field
                .read(&raw.engagement)
                .max(0)
                .saturating_mul(rule.factor)
        })
    }
}
