//! Indicator engine.
//!
//! Indicators are pure functions: bar history in, numeric series out, one value per row.
//! Each operates over the full series in one batch. The [`pipeline`] module chains them
//! with the drop-after-stage checkpoints and attaches the results to a [`BarSeries`].
//!
//! [`BarSeries`]: crate::domain::BarSeries

pub mod mfi;
pub mod obv;
pub mod patterns;
pub mod pipeline;
pub mod sma;

pub use mfi::{mfi_slope, ols_slope, Mfi, MfiComponents};
pub use obv::Obv;
pub use patterns::CandlePatterns;
pub use pipeline::{
    attach_mfi, attach_moving_averages, attach_obv, attach_patterns, IndicatorError,
    IndicatorParams, IndicatorPipeline,
};
pub use sma::Sma;

use crate::domain::{Bar, Column};

/// Trait for single-column indicators.
///
/// `compute` returns a `Vec<f64>` of the same length as `bars`; the first `lookback()`
/// values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Column the output is attached under.
    fn column(&self) -> Column;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic daily bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            make_bar(i, open, open.max(close) + 1.0, open.min(close) - 1.0, close, 1000.0)
        })
        .collect()
}

/// One synthetic daily bar at day offset `i` from 2024-01-02.
#[cfg(test)]
pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    Bar {
        timestamp: base + chrono::Duration::days(i as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
