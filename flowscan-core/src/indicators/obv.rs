//! On-Balance Volume (OBV).
//!
//! Running total of volume signed by the close-to-close direction. The first bar
//! contributes 0 and the total is never reset.

use super::Indicator;
use crate::domain::{Bar, Column};

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Indicator for Obv {
    fn column(&self) -> Column {
        Column::Obv
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = Vec::with_capacity(bars.len());
        let mut total = 0.0;
        for (i, bar) in bars.iter().enumerate() {
            let step = match i.checked_sub(1).map(|p| bar.close - bars[p].close) {
                Some(d) if d > 0.0 => bar.volume,
                Some(d) if d < 0.0 => -bar.volume,
                _ => 0.0,
            };
            // A missing volume leaves a hole at that row without poisoning the running total.
            if step.is_nan() {
                result.push(f64::NAN);
                continue;
            }
            total += step;
            result.push(total);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn signed_cumulative_volume() {
        let bars = make_bars(&[10.0, 11.0, 11.0, 9.0, 12.0]);
        let obv = Obv.compute(&bars);
        assert_eq!(obv, vec![0.0, 1000.0, 1000.0, 0.0, 1000.0]);
    }

    #[test]
    fn constant_closes_stay_zero() {
        let bars = make_bars(&[100.0; 21]);
        assert!(Obv.compute(&bars).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn missing_volume_is_a_hole() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].volume = f64::NAN;
        let obv = Obv.compute(&bars);
        assert!(obv[2].is_nan());
        assert_eq!(obv[3], 2000.0);
    }

    #[test]
    fn empty_input() {
        assert!(Obv.compute(&[]).is_empty());
    }
}
