//! Timestamp helpers.
//!
//! Every timestamp column is stored as an RFC 3339 UTC string with fixed
//! microsecond precision, so string comparison in SQL matches chronological order.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::domain::DomainError;

pub fn to_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_str() -> String {
    to_ts(Utc::now())
}

pub fn from_now(delta: Duration) -> String {
    to_ts(Utc::now() + delta)
}

pub fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Re-render a client supplied timestamp in the canonical storage format.
pub fn normalize_ts(field: &str, value: &str) -> Result<String, DomainError> {
    parse_ts(value)
        .map(to_ts)
        .ok_or_else(|| DomainError::Validation(format!("{} must be an RFC 3339 timestamp", field)))
}

pub fn normalize_opt_ts(field: &str, value: Option<&str>) -> Result<Option<String>, DomainError> {
    match value {
        Some(v) if !v.trim().is_empty() => normalize_ts(field, v).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strings_sort_chronologically() {
        let earlier = normalize_ts("t", "2024-01-01T10:00:00+07:00").unwrap();
        let later = normalize_ts("t", "2024-01-01T03:00:00.5Z").unwrap();
        assert_eq!(earlier, "2024-01-01T03:00:00.000000Z");
        assert!(earlier < later);
    }

    #[test]
    fn rejects_garbage() {
        assert!(normalize_ts("valid_from", "yesterday").is_err());
        assert_eq!(normalize_opt_ts("x", Some("  ")).unwrap(), None);
    }
}
