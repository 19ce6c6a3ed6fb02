//! Bar series: an ordered, time-indexed table of bars plus attached columns.
//!
//! Invariants held by every `BarSeries`:
//! - rows are sorted by timestamp, ascending
//! - timestamps are unique (the first occurrence wins on construction)
//! - every attached column has exactly one entry per row
//!
//! Stages attach columns and never reorder rows. Rows only disappear through
//! [`BarSeries::retain`] and [`BarSeries::drop_incomplete`], so a series can only shrink.

use super::bar::{Bar, Resolution};
use crate::signals::SignalKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric indicator columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    TypicalPrice,
    MoneyFlowRatio,
    Mfi,
    MfiSlope,
    Obv,
    /// Trailing mean of close over `n` rows.
    Ma(usize),
}

impl Column {
    pub fn name(&self) -> String {
        match self {
            Self::TypicalPrice => "typical_price".to_string(),
            Self::MoneyFlowRatio => "money_flow_ratio".to_string(),
            Self::Mfi => "MFI".to_string(),
            Self::MfiSlope => "MFI_slope".to_string(),
            Self::Obv => "OBV".to_string(),
            Self::Ma(n) => format!("MA_{n}"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Boolean candlestick / volume pattern columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    Hammer,
    BullishEngulfing,
    MorningStar,
    ShootingStar,
    BearishEngulfing,
    EveningStar,
    VolumeSurge,
}

impl Pattern {
    pub const ALL: [Pattern; 7] = [
        Pattern::Hammer,
        Pattern::BullishEngulfing,
        Pattern::MorningStar,
        Pattern::ShootingStar,
        Pattern::BearishEngulfing,
        Pattern::EveningStar,
        Pattern::VolumeSurge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hammer => "Hammer",
            Self::BullishEngulfing => "Bullish_Engulfing",
            Self::MorningStar => "Morning_Star",
            Self::ShootingStar => "Shooting_Star",
            Self::BearishEngulfing => "Bearish_Engulfing",
            Self::EveningStar => "Evening_Star",
            Self::VolumeSurge => "Volume_Surge",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered bars for one symbol with indicator, pattern and signal columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    resolution: Resolution,
    bars: Vec<Bar>,
    values: IndexMap<Column, Vec<f64>>,
    patterns: IndexMap<Pattern, Vec<bool>>,
    signals: IndexMap<SignalKind, Vec<bool>>,
}

impl BarSeries {
    /// Build a series from raw provider rows: sorts ascending and drops duplicate timestamps.
    pub fn new(symbol: impl Into<String>, resolution: Resolution, mut bars: Vec<Bar>) -> Self {
        // Stable sort keeps provider order among equal timestamps, so dedup keeps the first.
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            symbol: symbol.into(),
            resolution,
            bars,
            values: IndexMap::new(),
            patterns: IndexMap::new(),
            signals: IndexMap::new(),
        }
    }

    pub fn empty(symbol: impl Into<String>, resolution: Resolution) -> Self {
        Self::new(symbol, resolution, Vec::new())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Full numeric column, if attached.
    pub fn value(&self, column: Column) -> Option<&[f64]> {
        self.values.get(&column).map(|v| v.as_slice())
    }

    /// Numeric column value at a row. NaN (missing) is returned as `None`.
    pub fn value_at(&self, column: Column, row: usize) -> Option<f64> {
        self.values
            .get(&column)
            .and_then(|v| v.get(row).copied())
            .filter(|v| !v.is_nan())
    }

    pub fn pattern(&self, pattern: Pattern) -> Option<&[bool]> {
        self.patterns.get(&pattern).map(|v| v.as_slice())
    }

    pub fn signal(&self, kind: SignalKind) -> Option<&[bool]> {
        self.signals.get(&kind).map(|v| v.as_slice())
    }

    /// Attached numeric columns in attachment order.
    pub fn values(&self) -> impl Iterator<Item = (Column, &[f64])> {
        self.values.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn patterns(&self) -> impl Iterator<Item = (Pattern, &[bool])> {
        self.patterns.iter().map(|(p, v)| (*p, v.as_slice()))
    }

    pub fn signals(&self) -> impl Iterator<Item = (SignalKind, &[bool])> {
        self.signals.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Attach (or replace) a numeric column.
    ///
    /// # Panics
    /// If `values.len()` differs from the row count.
    pub fn with_values(mut self, column: Column, values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            self.bars.len(),
            "column {column} has {} rows, series has {}",
            values.len(),
            self.bars.len()
        );
        self.values.insert(column, values);
        self
    }

    /// Attach (or replace) a pattern column.
    ///
    /// # Panics
    /// If `flags.len()` differs from the row count.
    pub fn with_pattern(mut self, pattern: Pattern, flags: Vec<bool>) -> Self {
        assert_eq!(flags.len(), self.bars.len(), "pattern {pattern} length mismatch");
        self.patterns.insert(pattern, flags);
        self
    }

    /// Attach (or replace) a signal column.
    ///
    /// # Panics
    /// If `flags.len()` differs from the row count.
    pub fn with_signal(mut self, kind: SignalKind, flags: Vec<bool>) -> Self {
        assert_eq!(flags.len(), self.bars.len(), "signal {kind} length mismatch");
        self.signals.insert(kind, flags);
        self
    }

    /// Keep only rows where `keep[i]` is true, filtering every attached column alongside.
    ///
    /// # Panics
    /// If `keep.len()` differs from the row count.
    pub fn retain(mut self, keep: &[bool]) -> Self {
        assert_eq!(keep.len(), self.bars.len(), "row mask length mismatch");
        if keep.iter().all(|k| *k) {
            return self;
        }
        self.bars = filter_rows(&self.bars, keep);
        for column in self.values.values_mut() {
            *column = filter_rows(column, keep);
        }
        for column in self.patterns.values_mut() {
            *column = filter_rows(column, keep);
        }
        for column in self.signals.values_mut() {
            *column = filter_rows(column, keep);
        }
        self
    }

    /// Checkpoint: drop every row with a missing OHLCV value or a missing value in
    /// any attached numeric column.
    pub fn drop_incomplete(self) -> Self {
        let keep: Vec<bool> = (0..self.bars.len())
            .map(|i| !self.bars[i].is_void() && self.values.values().all(|col| !col[i].is_nan()))
            .collect();
        self.retain(&keep)
    }

    /// BLAKE3 hash over the bar rows, for reproducibility reports.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        for bar in &self.bars {
            hasher.update(bar.timestamp.to_string().as_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn filter_rows<T: Copy>(rows: &[T], keep: &[bool]) -> Vec<T> {
    rows.iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(r, _)| *r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn new_sorts_and_dedupes_keeping_first() {
        let series = BarSeries::new(
            "SPY",
            Resolution::Daily,
            vec![bar(3, 30.0), bar(1, 10.0), bar(3, 99.0), bar(2, 20.0)],
        );
        let closes = series.closes();
        assert_eq!(closes, vec![10.0, 20.0, 30.0]);
        assert!(series
            .bars()
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn drop_incomplete_filters_all_columns() {
        let series = BarSeries::new(
            "SPY",
            Resolution::Daily,
            vec![bar(1, 10.0), bar(2, 20.0), bar(3, 30.0)],
        )
        .with_values(Column::Mfi, vec![f64::NAN, 50.0, 60.0])
        .with_pattern(Pattern::Hammer, vec![true, false, true]);

        let dropped = series.drop_incomplete();
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped.value(Column::Mfi).unwrap(), &[50.0, 60.0]);
        assert_eq!(dropped.pattern(Pattern::Hammer).unwrap(), &[false, true]);
    }

    #[test]
    fn drop_incomplete_removes_void_bars() {
        let mut bars = vec![bar(1, 10.0), bar(2, 20.0)];
        bars[0].close = f64::NAN;
        let series = BarSeries::new("SPY", Resolution::Daily, bars).drop_incomplete();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].close, 20.0);
    }

    #[test]
    fn value_at_hides_nan() {
        let series = BarSeries::new("SPY", Resolution::Daily, vec![bar(1, 10.0), bar(2, 20.0)])
            .with_values(Column::Ma(20), vec![f64::NAN, 15.0]);
        assert_eq!(series.value_at(Column::Ma(20), 0), None);
        assert_eq!(series.value_at(Column::Ma(20), 1), Some(15.0));
        assert_eq!(series.value_at(Column::Obv, 1), None);
    }

    #[test]
    #[should_panic(expected = "rows")]
    fn misaligned_column_panics() {
        let series = BarSeries::new("SPY", Resolution::Daily, vec![bar(1, 10.0)]);
        let _ = series.with_values(Column::Obv, vec![1.0, 2.0]);
    }

    #[test]
    fn column_names() {
        assert_eq!(Column::Ma(20).name(), "MA_20");
        assert_eq!(Column::MfiSlope.name(), "MFI_slope");
        assert_eq!(Pattern::MorningStar.name(), "Morning_Star");
    }

    #[test]
    fn content_hash_is_stable() {
        let a = BarSeries::new("SPY", Resolution::Daily, vec![bar(1, 10.0), bar(2, 20.0)]);
        let b = BarSeries::new("SPY", Resolution::Daily, vec![bar(2, 20.0), bar(1, 10.0)]);
        assert_eq!(a.content_hash(), b.content_hash());
        let c = BarSeries::new("SPY", Resolution::Daily, vec![bar(1, 10.0), bar(2, 21.0)]);
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
