//! Monitoring projects and their settings rules.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plans::PlanLimits;
use crate::CoreError;

/// Shortest schedule interval any plan may use.
pub const MIN_SCHEDULE_MINUTES: i32 = 5;
/// Longest schedule interval.
pub const MAX_SCHEDULE_MINUTES: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
}

impl ProjectStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            other => Err(CoreError::InvalidProjectStatus(other.to_string())),
        }
    }
}

/// A monitoring project owned by one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub boolean_query: String,
    /// Per-connector enabled flags. Connectors missing from the map use their
    /// own default.
    pub sources: BTreeMap<String, bool>,
    pub schedule_minutes: i32,
    pub geo_focus: String,
    pub status: ProjectStatus,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Whether connector `id` runs for this project.
    #[must_use]
    pub fn source_enabled(&self, id: &str, enabled_by_default: bool) -> bool {
        self.sources.get(id).copied().unwrap_or(enabled_by_default)
    }

    /// Whether at least `schedule_minutes` have elapsed since the last run.
    /// A project that never ran is always due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => now - last >= Duration::minutes(i64::from(self.schedule_minutes)),
        }
    }

    /// Free-text query handed to upstream search APIs: keywords joined by a
    /// space, else the boolean query, else the project name.
    #[must_use]
    pub fn search_query(&self) -> String {
        if !self.keywords.is_empty() {
            return self.keywords.join(" ");
        }
        if !self.boolean_query.trim().is_empty() {
            return self.boolean_query.clone();
        }
        self.name.clone()
    }
}

/// Trim keywords and drop empty and case-insensitive duplicates, keeping the
/// first spelling and the original order.
#[must_use]
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Validate project settings against a plan and return the normalized keywords.
///
/// # Errors
///
/// Returns [`CoreError::KeywordLimit`] if the plan's keyword limit is exceeded,
/// or [`CoreError::ScheduleOutOfRange`] if the interval is outside
/// `[plan.min_interval_minutes, 60]`.
pub fn validate_project_settings(
    plan_name: &str,
    plan: &PlanLimits,
    keywords: &[String],
    schedule_minutes: i32,
) -> Result<Vec<String>, CoreError> {
    let keywords = normalize_keywords(keywords);
    if keywords.len() > plan.keyword_limit {
        return Err(CoreError::KeywordLimit {
            plan: plan_name.to_string(),
            limit: plan.keyword_limit,
            got: keywords.len(),
        });
    }

    let min = plan.min_interval_minutes.max(MIN_SCHEDULE_MINUTES);
    if !(min..=MAX_SCHEDULE_MINUTES).contains(&schedule_minutes) {
        return Err(CoreError::ScheduleOutOfRange {
            got: schedule_minutes,
            min,
            max: MAX_SCHEDULE_MINUTES,
        });
    }

    Ok(keywords)
}
