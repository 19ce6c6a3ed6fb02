//! Simple Moving Average (SMA).
//!
//! Trailing mean of close prices over a window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::{Bar, Column};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }
}

impl Indicator for Sma {
    fn column(&self) -> Column {
        Column::Ma(self.period)
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        // Rolling sum; a NaN anywhere in the window forces a rescan so it can't poison later windows.
        let mut sum: f64 = bars[..self.period].iter().map(|b| b.close).sum();
        result[self.period - 1] = sum / self.period as f64;

        for i in self.period..n {
            let leaving = bars[i - self.period].close;
            let entering = bars[i].close;
            if sum.is_nan() || leaving.is_nan() || entering.is_nan() {
                sum = bars[(i + 1 - self.period)..=i].iter().map(|b| b.close).sum();
            } else {
                sum += entering - leaving;
            }
            result[i] = sum / self.period as f64;
        }

        result
    }
}
