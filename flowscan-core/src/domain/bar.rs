//! Bar: one period of trading activity.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OHLCV bar for a single period.
///
/// Timestamps are timezone-naive. Daily bars sit at midnight of the trading date,
/// hourly bars carry the UTC wall-clock time of the bar open.
///
/// Missing or unparseable values are carried as `f64::NAN`. OHLC consistency
/// (`low <= open, close <= high`) is not enforced: providers may ship inconsistent rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Calendar date of the bar.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// min(open, close) - low
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// high - max(open, close)
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Bar granularity requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Daily,
    Hourly,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "day" | "1d" => Ok(Self::Daily),
            "hourly" | "hour" | "1h" => Ok(Self::Hourly),
            other => Err(format!("unknown resolution '{other}' (expected daily or hourly)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn bar_geometry() {
        let bar = sample_bar();
        assert_eq!(bar.body(), 3.0);
        assert_eq!(bar.lower_wick(), 2.0);
        assert_eq!(bar.upper_wick(), 2.0);
        assert!((bar.typical_price() - 102.0).abs() < 1e-12);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        assert!(!bar.is_void());
        bar.volume = f64::NAN;
        assert!(bar.is_void());
    }

    #[test]
    fn inconsistent_ohlc_is_not_void() {
        let mut bar = sample_bar();
        bar.high = 90.0; // below low
        assert!(!bar.is_void());
    }

    #[test]
    fn resolution_parses() {
        assert_eq!("Daily".parse::<Resolution>().unwrap(), Resolution::Daily);
        assert_eq!("1h".parse::<Resolution>().unwrap(), Resolution::Hourly);
        assert!("weekly".parse::<Resolution>().is_err());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
