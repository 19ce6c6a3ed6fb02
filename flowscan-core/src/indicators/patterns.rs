//! Candlestick pattern detection over raw OHLCV.
//!
//! Patterns are independent of MFI/OBV/MA. A pattern that looks back past the start
//! of the series is false, never missing.

use crate::domain::{Bar, Pattern};

/// Body-to-range ratio below which the middle bar of a star counts as indecisive.
const STAR_BODY_RATIO: f64 = 0.3;

/// Number of preceding bars averaged for the volume-surge baseline.
const SURGE_BASELINE: usize = 3;

#[derive(Debug, Clone)]
pub struct CandlePatterns {
    volume_multiplier: f64,
}

impl Default for CandlePatterns {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl CandlePatterns {
    pub fn new(volume_multiplier: f64) -> Self {
        Self { volume_multiplier }
    }

    /// Flags for one pattern, one per bar.
    pub fn detect(&self, pattern: Pattern, bars: &[Bar]) -> Vec<bool> {
        (0..bars.len())
            .map(|i| match pattern {
                Pattern::Hammer => hammer(&bars[i]),
                Pattern::ShootingStar => shooting_star(&bars[i]),
                Pattern::BullishEngulfing => i >= 1 && bullish_engulfing(&bars[i - 1], &bars[i]),
                Pattern::BearishEngulfing => i >= 1 && bearish_engulfing(&bars[i - 1], &bars[i]),
                Pattern::MorningStar => {
                    i >= 2 && morning_star(&bars[i - 2], &bars[i - 1], &bars[i])
                }
                Pattern::EveningStar => {
                    i >= 2 && evening_star(&bars[i - 2], &bars[i - 1], &bars[i])
                }
                Pattern::VolumeSurge => self.volume_surge(bars, i),
            })
            .collect()
    }

    /// Every pattern, in [`Pattern::ALL`] order.
    pub fn detect_all(&self, bars: &[Bar]) -> Vec<(Pattern, Vec<bool>)> {
        Pattern::ALL
            .into_iter()
            .map(|p| (p, self.detect(p, bars)))
            .collect()
    }

    fn volume_surge(&self, bars: &[Bar], i: usize) -> bool {
        if i < SURGE_BASELINE {
            return false;
        }
        let baseline = bars[i - SURGE_BASELINE..i]
            .iter()
            .map(|b| b.volume)
            .sum::<f64>()
            / SURGE_BASELINE as f64;
        bars[i].volume > self.volume_multiplier * baseline
    }
}

pub fn hammer(bar: &Bar) -> bool {
    bar.lower_wick() >= 2.0 * bar.body() && bar.upper_wick() <= 0.5 * bar.body()
}

pub fn shooting_star(bar: &Bar) -> bool {
    bar.upper_wick() >= 2.0 * bar.body() && bar.lower_wick() <= 0.5 * bar.body()
}

pub fn bullish_engulfing(prev: &Bar, cur: &Bar) -> bool {
    prev.is_bearish() && cur.is_bullish() && cur.open < prev.close && cur.close > prev.open
}

pub fn bearish_engulfing(prev: &Bar, cur: &Bar) -> bool {
    prev.is_bullish() && cur.is_bearish() && cur.open > prev.close && cur.close < prev.open
}

fn indecisive(bar: &Bar) -> bool {
    bar.body() < STAR_BODY_RATIO * (bar.high - bar.low)
}

fn body_midpoint(bar: &Bar) -> f64 {
    (bar.open + bar.close) / 2.0
}

pub fn morning_star(first: &Bar, middle: &Bar, last: &Bar) -> bool {
    first.is_bearish()
        && indecisive(middle)
        && middle.open < first.close
        && last.is_bullish()
        && last.close > body_midpoint(first)
}

pub fn evening_star(first: &Bar, middle: &Bar, last: &Bar) -> bool {
    first.is_bullish()
        && indecisive(middle)
        && middle.open > first.close
        && last.is_bearish()
        && last.close < body_midpoint(first)
}
