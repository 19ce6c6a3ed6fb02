//! Per-bar rule evaluation.
//!
//! Every rule reads bars plus attached columns. A missing input (warm-up, absent column,
//! look-back past the first row) evaluates to false.

use super::kind::{SignalKind, SignalMode};
use crate::domain::{BarSeries, Column};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Close within this fraction of the short MA counts as support.
const MA_SUPPORT_BAND: f64 = 0.03;
const MFI_OVERSOLD: f64 = 30.0;
const MFI_OVERBOUGHT: f64 = 70.0;

/// Last-row flags needed before a ticker counts as signaling.
const SIGNALING_QUORUM: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Trailing window for the rolling MFI min/max.
    pub signal_window: usize,
    pub slope_threshold: f64,
    pub price_change_lookback: usize,
    /// Percent.
    pub price_change_threshold: f64,
    /// Moving-average windows read by `MA_Support`; mirrored from the indicator parameters.
    #[serde(skip, default = "default_ma_short")]
    pub ma_short: usize,
    #[serde(skip, default = "default_ma_long")]
    pub ma_long: usize,
}

fn default_ma_short() -> usize {
    20
}

fn default_ma_long() -> usize {
    50
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            signal_window: 5,
            slope_threshold: 1.0,
            price_change_lookback: 3,
            price_change_threshold: 5.0,
            ma_short: default_ma_short(),
            ma_long: default_ma_long(),
        }
    }
}

/// Compute the selected flags of the active catalog and attach them as signal columns.
///
/// Selected kinds outside the catalog are ignored; unselected kinds stay absent.
pub fn generate_flags(
    series: BarSeries,
    params: &SignalParams,
    selected: &[SignalKind],
    mode: SignalMode,
) -> BarSeries {
    let mut flags = Vec::new();
    for &kind in selected {
        if !mode.contains(kind) {
            debug!(signal = %kind, mode = %mode, "signal not in active catalog, skipped");
            continue;
        }
        flags.push((kind, evaluate(&series, params, kind)));
    }
    flags
        .into_iter()
        .fold(series, |series, (kind, f)| series.with_signal(kind, f))
}

/// Evaluate one rule over every row.
pub fn evaluate(series: &BarSeries, params: &SignalParams, kind: SignalKind) -> Vec<bool> {
    let n = series.len();
    if let Some(pattern) = kind.pattern() {
        return series
            .pattern(pattern)
            .map(|f| f.to_vec())
            .unwrap_or_else(|| vec![false; n]);
    }

    let closes = series.closes();
    let close_rose = |i: usize| i >= 1 && closes[i] > closes[i - 1];
    let at = |column: Column, i: usize| series.value_at(column, i);

    (0..n)
        .map(|i| match kind {
            SignalKind::MaSupport => {
                let (Some(short), Some(long)) = (
                    at(Column::Ma(params.ma_short), i),
                    at(Column::Ma(params.ma_long), i),
                ) else {
                    return false;
                };
                closes[i] >= short * (1.0 - MA_SUPPORT_BAND)
                    && closes[i] <= short * (1.0 + MA_SUPPORT_BAND)
                    && short > long
            }
            SignalKind::MfiOversoldRebound => {
                let low = rolling(series, Column::Mfi, i, params.signal_window, f64::min);
                let slope = at(Column::MfiSlope, i);
                matches!(
                    (low, slope),
                    (Some(l), Some(s)) if l < MFI_OVERSOLD && s >= params.slope_threshold
                )
            }
            SignalKind::MfiOverboughtPullback => {
                let high = rolling(series, Column::Mfi, i, params.signal_window, f64::max);
                let slope = at(Column::MfiSlope, i);
                matches!(
                    (high, slope),
                    (Some(h), Some(s)) if h > MFI_OVERBOUGHT && s <= -params.slope_threshold
                )
            }
            SignalKind::PriceUp => {
                let lb = params.price_change_lookback;
                i >= lb
                    && (closes[i] / closes[i - lb] - 1.0) * 100.0 > params.price_change_threshold
            }
            SignalKind::ObvBearishDivergence => {
                close_rose(i)
                    && matches!(
                        (at(Column::Obv, i), at(Column::Obv, i.wrapping_sub(1))),
                        (Some(now), Some(prev)) if now < prev
                    )
            }
            SignalKind::MfiBearishDivergence => {
                close_rose(i)
                    && matches!(
                        (at(Column::Mfi, i), at(Column::Mfi, i.wrapping_sub(1))),
                        (Some(now), Some(prev)) if now < prev && now > MFI_OVERBOUGHT
                    )
            }
            // pattern-backed kinds returned above
            _ => false,
        })
        .collect()
}

/// Fold over the trailing `window` values of a column ending at `row`.
/// Missing if the window reaches before the first row or holds a missing value.
fn rolling(
    series: &BarSeries,
    column: Column,
    row: usize,
    window: usize,
    fold: fn(f64, f64) -> f64,
) -> Option<f64> {
    let values = series.value(column)?;
    if window == 0 || row + 1 < window {
        return None;
    }
    let w = &values[(row + 1 - window)..=row];
    if w.iter().any(|v| v.is_nan()) {
        return None;
    }
    w.iter().copied().reduce(fold)
}

/// Whether the most recent row carries at least `min(3, |active|)` true flags, where
/// `active` is the part of `selected` that belongs to `mode`'s catalog.
///
/// Kinds outside the catalog are never computed and do not raise the quorum. An active
/// flag that is absent counts as false. An empty active selection or an empty series
/// never signals.
pub fn is_signaling(series: &BarSeries, selected: &[SignalKind], mode: SignalMode) -> bool {
    let active: Vec<SignalKind> = selected
        .iter()
        .copied()
        .filter(|k| mode.contains(*k))
        .collect();
    if active.is_empty() || series.is_empty() {
        return false;
    }
    let last = series.len() - 1;
    let hits = active
        .iter()
        .filter(|kind| series.signal(**kind).is_some_and(|f| f[last]))
        .count();
    hits >= SIGNALING_QUORUM.min(active.len())
}
