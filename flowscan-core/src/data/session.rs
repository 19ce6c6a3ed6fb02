//! Session filter for intraday feeds.
//!
//! Provider output is noisy outside the regular cash session: pre/post-market bars and
//! whole days with no reported volume (holidays that some vendors still emit). The filter
//! keeps only bars inside an inclusive UTC hour range and only days that traded.

use crate::domain::BarSeries;
use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inclusive UTC hour-of-day range for intraday bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for SessionHours {
    /// 13:00–19:00 UTC, the US cash session.
    fn default() -> Self {
        Self {
            start_hour: 13,
            end_hour: 19,
        }
    }
}

impl SessionHours {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour <= self.end_hour
    }
}

/// Drop rows whose price or volume failed numeric coercion.
pub fn coerce(series: BarSeries) -> BarSeries {
    let keep: Vec<bool> = series.bars().iter().map(|b| !b.is_void()).collect();
    series.retain(&keep)
}

/// Keep bars inside `hours`, then drop calendar days whose remaining volume sums to zero.
pub fn restrict(series: BarSeries, hours: SessionHours) -> BarSeries {
    let in_session: Vec<bool> = series
        .bars()
        .iter()
        .map(|b| hours.contains(b.timestamp.hour()))
        .collect();
    let series = series.retain(&in_session);

    let mut day_volume: HashMap<NaiveDate, f64> = HashMap::new();
    for bar in series.bars() {
        *day_volume.entry(bar.date()).or_insert(0.0) += bar.volume;
    }
    let traded: Vec<bool> = series
        .bars()
        .iter()
        .map(|b| day_volume.get(&b.date()).is_some_and(|v| *v > 0.0))
        .collect();
    series.retain(&traded)
}
