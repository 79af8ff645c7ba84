//! Server-assigned points in time.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant.
///
/// Message ordering and conversation previews key on this type, so it
/// compares at full (nanosecond) precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Strictly earlier than `other`.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    /// Shifted by `millis`; negative values move backwards.
    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0 + Duration::milliseconds(millis))
    }

    /// Client-facing form: RFC 3339, millisecond precision, `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(raw)
            .unwrap()
            .with_timezone(&Utc)
            .into()
    }

    #[test]
    fn now_falls_between_surrounding_clock_reads() {
        let before = Utc::now();
        let ts = Timestamp::now();
        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &Utc::now());
    }

    #[test]
    fn offsets_preserve_ordering() {
        let base = at("2024-03-01T08:00:00Z");
        assert!(base.is_before(&base.plus_millis(1)));
        assert!(base.plus_millis(-1).is_before(&base));
        assert!(!base.is_before(&base));
    }

    #[test]
    fn client_form_truncates_to_millis() {
        assert_eq!(
            at("2024-01-15T10:30:00.123456Z").to_rfc3339(),
            "2024-01-15T10:30:00.123Z"
        );
        assert_eq!(at("2024-01-15T12:30:00+02:00").to_rfc3339(), "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn serde_is_transparent() {
        let ts: Timestamp = serde_json::from_str("\"2024-01-15T10:30:00Z\"").unwrap();
        assert_eq!(ts, at("2024-01-15T10:30:00Z"));
    }
}
