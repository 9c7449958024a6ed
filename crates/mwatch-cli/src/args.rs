//! Value parsers shared by several subcommands.

use chrono::{DateTime, NaiveDate, Utc};

/// Accept a bare `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected YYYY-MM-DD or RFC 3339 timestamp: {e}"))
}

/// `YYYY-MM` with a real month.
pub(crate) fn parse_month(raw: &str) -> Result<String, String> {
    let invalid = || format!("expected month as YYYY-MM, got '{raw}'");
    if raw.len() != 7 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map(|_| raw.to_string())
        .map_err(|_| invalid())
}

/// `connector=on|off` (also `true|false`).
pub(crate) fn parse_source_flag(raw: &str) -> Result<(String, bool), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected connector=on|off, got '{raw}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing connector id in '{raw}'"));
    }
    let enabled = match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" => true,
        "off" | "false" => false,
        other => return Err(format!("expected on or off for '{id}', got '{other}'")),
    };
    Ok((id.to_string(), enabled))
}
