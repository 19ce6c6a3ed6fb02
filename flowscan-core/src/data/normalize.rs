//! Normalization helpers shared by the provider adapters.
//!
//! Numeric coercion happens exactly once, here, immediately after a payload is decoded:
//! string-typed prices and volumes become `f64`, and anything unparseable becomes NaN
//! (the missing marker later dropped by the session checkpoint).

use crate::domain::Resolution;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::Deserialize;

/// A JSON field that should hold a number but may arrive as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_finite() => *n,
            Self::Number(_) => f64::NAN,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(f64::NAN),
        }
    }
}

/// Coerce an optional numeric field; absent or null becomes NaN.
pub fn price(value: &Option<Numeric>) -> f64 {
    value.as_ref().map_or(f64::NAN, Numeric::as_f64)
}

/// Coerce a volume field. Vendors that omit volume get 0; a present but unparseable value is NaN.
pub fn volume(value: &Option<Numeric>) -> f64 {
    value.as_ref().map_or(0.0, Numeric::as_f64)
}

/// Epoch seconds to a naive UTC timestamp.
pub fn from_epoch_seconds(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc())
}

/// Epoch milliseconds to a naive UTC timestamp.
pub fn from_epoch_millis(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ts).map(|dt| dt.naive_utc())
}

/// Parse the date/time encodings vendors use.
///
/// Offsets are honored and converted to UTC. Date-only strings map to midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    // "+0000" offsets (no colon) are not RFC 3339.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Convert a US/Eastern wall-clock time (as some vendors report intraday bars) to naive UTC.
///
/// Ambiguous fall-back times resolve to the earlier instant.
pub fn eastern_to_utc(local: NaiveDateTime) -> Option<NaiveDateTime> {
    chrono_tz::America::New_York
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.naive_utc())
}

/// Daily bars carry only their date: truncate any time component to midnight.
pub fn align_to_resolution(ts: NaiveDateTime, resolution: Resolution) -> NaiveDateTime {
    match resolution {
        Resolution::Daily => ts.date().and_time(chrono::NaiveTime::MIN),
        Resolution::Hourly => ts,
    }
}
