//! Timestamp encoding shared by the store and snapshot files.
//!
//! Stored timestamps are fixed-width RFC 3339 UTC strings with microsecond
//! precision, so ordering by the text column is chronological. Incoming
//! timestamps are parsed leniently: RFC 3339 with any offset, or a naive
//! ISO 8601 date-time (`T` or space separated) taken as UTC.

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Current time at storage precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Encode a timestamp for storage.
pub fn encode(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whether [`encode`] produces the fixed-width form for `ts`.
///
/// Years outside 0000-9999 gain a sign and break text ordering.
pub fn storable(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// `ts + delta`, or `None` if the result is not [`storable`].
pub fn checked_add(ts: &DateTime<Utc>, delta: TimeDelta) -> Option<DateTime<Utc>> {
    ts.checked_add_signed(delta).filter(storable)
}

/// Parse a timestamp written by [`encode`] or supplied by a caller.
///
/// Returns `None` for anything that is not [`storable`].
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc)).filter(storable);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .filter(storable)
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using the lenient parser.
pub mod lenient {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&encode(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}

/// Serde adapter for required `DateTime<Utc>` fields.
pub mod fixed {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
