//! Money Flow Index (MFI) and its regression slope.
//!
//! typical = (high + low + close) / 3, raw flow = typical × volume.
//! Positive flow where typical rose vs the previous bar, negative where it fell, neither
//! on equality or on the first bar. ratio = Σpos / (Σneg + ε) over the trailing `period`.
//! MFI = 100 − 100 / (1 + ratio).
//!
//! Edge cases: Σneg == 0 with Σpos > 0 → MFI ≈ 100; both zero → MFI = 0.

use super::Indicator;
use crate::domain::{Bar, Column};

/// Division guard for the money-flow ratio.
pub const RATIO_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
}

/// Every column the MFI stage attaches.
#[derive(Debug, Clone, PartialEq)]
pub struct MfiComponents {
    pub typical_price: Vec<f64>,
    pub money_flow_ratio: Vec<f64>,
    pub mfi: Vec<f64>,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self { period }
    }

    pub fn components(&self, bars: &[Bar]) -> MfiComponents {
        let n = bars.len();
        let typical: Vec<f64> = bars.iter().map(Bar::typical_price).collect();

        let mut positive = vec![0.0; n];
        let mut negative = vec![0.0; n];
        for i in 1..n {
            let raw = typical[i] * bars[i].volume;
            if typical[i] > typical[i - 1] {
                positive[i] = raw;
            } else if typical[i] < typical[i - 1] {
                negative[i] = raw;
            }
        }

        let mut ratio = vec![f64::NAN; n];
        let mut mfi = vec![f64::NAN; n];
        for i in (self.period - 1)..n {
            let window = (i + 1 - self.period)..=i;
            let pos: f64 = positive[window.clone()].iter().sum();
            let neg: f64 = negative[window].iter().sum();
            let r = pos / (neg + RATIO_EPSILON);
            ratio[i] = r;
            mfi[i] = 100.0 - 100.0 / (1.0 + r);
        }

        MfiComponents {
            typical_price: typical,
            money_flow_ratio: ratio,
            mfi,
        }
    }
}

impl Indicator for Mfi {
    fn column(&self) -> Column {
        Column::Mfi
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.components(bars).mfi
    }
}

/// Ordinary-least-squares slope of `y` against x = 0..len.
///
/// A single point has no defined trend; its slope is 0.
pub fn ols_slope(y: &[f64]) -> f64 {
    let n = y.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, &v) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (v - y_mean);
        den += dx * dx;
    }
    num / den
}

/// Trailing OLS slope of `values` over `window` points.
///
/// Missing for the first `window - 1` rows and wherever the window holds a missing value.
pub fn mfi_slope(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "slope window must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in window.saturating_sub(1)..n {
        let w = &values[(i + 1 - window)..=i];
        if w.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = ols_slope(w);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bar, make_bars, DEFAULT_EPSILON};

    #[test]
    fn warmup_is_period_minus_one() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0, 13.0, 14.0]);
        let mfi = Mfi::new(3).compute(&bars);
        assert!(mfi[0].is_nan());
        assert!(mfi[1].is_nan());
        assert!(mfi[2..].iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn hand_computed_window() {
        // typical prices: 10, 12, 11 (flat OHLC bars), volume 100
        let bars = vec![
            make_bar(0, 10.0, 10.0, 10.0, 10.0, 100.0),
            make_bar(1, 12.0, 12.0, 12.0, 12.0, 100.0),
            make_bar(2, 11.0, 11.0, 11.0, 11.0, 100.0),
        ];
        let c = Mfi::new(3).components(&bars);
        // first bar contributes to neither side
        // pos = 1200, neg = 1100
        let ratio = 1200.0 / (1100.0 + RATIO_EPSILON);
        assert_approx(c.money_flow_ratio[2], ratio, DEFAULT_EPSILON);
        assert_approx(c.mfi[2], 100.0 - 100.0 / (1.0 + ratio), 1e-9);
        assert_eq!(c.typical_price, vec![10.0, 12.0, 11.0]);
    }

    #[test]
    fn only_positive_flow_is_near_100() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let mfi = Mfi::new(4).compute(&bars);
        assert!(mfi[4] > 99.999_999 && mfi[4] <= 100.0);
    }

    #[test]
    fn no_flow_is_zero() {
        let bars = make_bars(&[10.0; 6]);
        let mfi = Mfi::new(3).compute(&bars);
        assert_eq!(mfi[5], 0.0);
    }

    #[test]
    fn only_negative_flow_is_zero() {
        let bars = make_bars(&[14.0, 13.0, 12.0, 11.0]);
        let mfi = Mfi::new(3).compute(&bars);
        assert_approx(mfi[3], 0.0, 1e-9);
    }

    #[test]
    fn slope_of_a_line() {
        let values = [f64::NAN, 1.0, 3.0, 5.0, 7.0];
        let slope = mfi_slope(&values, 3);
        assert!(slope[0].is_nan());
        assert!(slope[1].is_nan());
        // window [NaN, 1, 3] is incomplete
        assert!(slope[2].is_nan());
        assert_approx(slope[3], 2.0, DEFAULT_EPSILON);
        assert_approx(slope[4], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn slope_window_one_is_flat() {
        let slope = mfi_slope(&[5.0, f64::NAN, 9.0], 1);
        assert_eq!(slope[0], 0.0);
        assert!(slope[1].is_nan());
        assert_eq!(slope[2], 0.0);
    }

    #[test]
    fn ols_matches_least_squares() {
        // y = [1, 2, 4]: slope = 1.5
        assert_approx(ols_slope(&[1.0, 2.0, 4.0]), 1.5, DEFAULT_EPSILON);
    }
}
