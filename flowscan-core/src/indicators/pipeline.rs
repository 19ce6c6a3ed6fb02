//! Staged indicator pipeline.
//!
//! Stage order and checkpoints:
//! 1. MFI + slope, then drop incomplete rows
//! 2. moving averages (no checkpoint)
//! 3. OBV, then drop incomplete rows (this is where the MA warm-up disappears)
//! 4. candlestick patterns, then drop incomplete rows
//!
//! Values computed before a checkpoint are carried through it, never recomputed on the
//! shorter series.

use super::{mfi_slope, CandlePatterns, Indicator, Mfi, Obv, Sma};
use crate::domain::{BarSeries, Column};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Indicator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub mfi_period: usize,
    pub slope_window: usize,
    pub ma_short: usize,
    pub ma_long: usize,
    pub volume_multiplier: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            mfi_period: 14,
            slope_window: 3,
            ma_short: 20,
            ma_long: 50,
            volume_multiplier: 2.0,
        }
    }
}

impl IndicatorParams {
    /// Input bars needed for at least one row to survive every checkpoint.
    pub fn required_bars(&self) -> usize {
        let ma = self.ma_short.max(self.ma_long);
        self.mfi_period + self.slope_window + ma - 2
    }
}

/// Attach `typical_price`, `money_flow_ratio`, `MFI` and `MFI_slope`.
pub fn attach_mfi(series: BarSeries, period: usize, slope_window: usize) -> BarSeries {
    let c = Mfi::new(period).components(series.bars());
    let slope = mfi_slope(&c.mfi, slope_window);
    series
        .with_values(Column::TypicalPrice, c.typical_price)
        .with_values(Column::MoneyFlowRatio, c.money_flow_ratio)
        .with_values(Column::Mfi, c.mfi)
        .with_values(Column::MfiSlope, slope)
}

/// Attach one `MA_{n}` column per window.
pub fn attach_moving_averages(series: BarSeries, windows: &[usize]) -> BarSeries {
    windows.iter().fold(series, |series, &window| {
        let sma = Sma::new(window);
        let values = sma.compute(series.bars());
        series.with_values(sma.column(), values)
    })
}

pub fn attach_obv(series: BarSeries) -> BarSeries {
    let values = Obv.compute(series.bars());
    series.with_values(Column::Obv, values)
}

pub fn attach_patterns(series: BarSeries, volume_multiplier: f64) -> BarSeries {
    let detected = CandlePatterns::new(volume_multiplier).detect_all(series.bars());
    detected
        .into_iter()
        .fold(series, |series, (pattern, flags)| series.with_pattern(pattern, flags))
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorPipeline {
    params: IndicatorParams,
}

impl IndicatorPipeline {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Run every stage with its checkpoint.
    ///
    /// Fails with [`IndicatorError::InsufficientData`] when the input is shorter than
    /// [`IndicatorParams::required_bars`] or when no row survives the checkpoints.
    pub fn run(&self, series: BarSeries) -> Result<BarSeries, IndicatorError> {
        let p = &self.params;
        let available = series.len();
        let required = p.required_bars();
        if available < required {
            return Err(IndicatorError::InsufficientData { required, available });
        }

        let series = attach_mfi(series, p.mfi_period, p.slope_window).drop_incomplete();
        debug!(rows = series.len(), "mfi stage");

        let series = attach_moving_averages(series, &[p.ma_short, p.ma_long]);

        let series = attach_obv(series).drop_incomplete();
        debug!(rows = series.len(), "obv stage");

        let series = attach_patterns(series, p.volume_multiplier).drop_incomplete();
        debug!(symbol = series.symbol(), rows = series.len(), "indicators complete");

        if series.is_empty() {
            return Err(IndicatorError::InsufficientData { required, available });
        }
        Ok(series)
    }
}
