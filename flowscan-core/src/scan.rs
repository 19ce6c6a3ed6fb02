//! Per-symbol analysis and batch scanning.
//!
//! One symbol runs fetch → session filter → indicators → signals. In a batch each
//! symbol is isolated: a failure is recorded and the scan moves on.

use crate::config::FlowScanConfig;
use crate::data::{session, FallbackFetcher, FetchError, FetchRequest, ProviderId};
use crate::domain::{BarSeries, Resolution};
use crate::indicators::IndicatorError;
use crate::signals::{generate_flags, is_signaling, SignalKind, SignalMode};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no {resolution} data for {symbol}")]
    NoData { symbol: String, resolution: Resolution },
}

/// What to analyze, shared by every symbol of a batch.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolution: Resolution,
    pub mode: SignalMode,
    pub selected: Vec<SignalKind>,
}

/// Outcome of analyzing one symbol.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub provider: ProviderId,
    /// Rows delivered by the provider, before session filtering and checkpoints.
    pub rows_fetched: usize,
    /// Decorated series: indicators, patterns and the selected signal flags.
    pub series: BarSeries,
    pub signaling: bool,
    /// Selected flags that are true on the last row.
    pub fired: Vec<SignalKind>,
    /// Set when the history was too short for the indicators; every flag is then false.
    pub insufficient: Option<IndicatorError>,
}

/// Progress callbacks for a batch scan.
pub trait ScanProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize);
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<SymbolReport, ScanError>,
    );
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress sink that ignores every event.
pub struct NoProgress;

impl ScanProgress for NoProgress {
    fn on_start(&self, _: &str, _: usize, _: usize) {}
    fn on_complete(&self, _: &str, _: usize, _: usize, _: &Result<SymbolReport, ScanError>) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize) {}
}

/// Summary of a batch scan.
#[derive(Debug)]
pub struct ScanSummary {
    pub total: usize,
    pub reports: Vec<SymbolReport>,
    pub errors: Vec<(String, ScanError)>,
}

impl ScanSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    /// Symbols meeting the signaling rule, in scan order.
    pub fn signaling(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.signaling)
            .map(|r| r.symbol.as_str())
            .collect()
    }
}

pub struct Scanner<'a> {
    fetcher: &'a FallbackFetcher,
    config: &'a FlowScanConfig,
}

impl<'a> Scanner<'a> {
    pub fn new(fetcher: &'a FallbackFetcher, config: &'a FlowScanConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch and session-filter one symbol without running indicators.
    pub fn load(
        &self,
        request: &FetchRequest,
    ) -> Result<(BarSeries, ProviderId, usize), ScanError> {
        let outcome = self.fetcher.fetch(request);
        let Some(provider) = outcome.provider else {
            return Err(match request.resolution {
                Resolution::Daily => ScanError::Fetch(FetchError::AllProvidersExhausted {
                    symbol: request.symbol.clone(),
                    resolution: request.resolution,
                    attempts: outcome.attempts,
                }),
                Resolution::Hourly => ScanError::NoData {
                    symbol: request.symbol.clone(),
                    resolution: request.resolution,
                },
            });
        };

        let rows_fetched = outcome.series.len();
        let mut series = session::coerce(outcome.series);
        if request.resolution == Resolution::Hourly {
            series = session::restrict(series, self.config.session);
        }
        if series.is_empty() {
            return Err(ScanError::NoData {
                symbol: request.symbol.clone(),
                resolution: request.resolution,
            });
        }
        Ok((series, provider, rows_fetched))
    }

    /// Run the full per-symbol pipeline.
    pub fn analyze(
        &self,
        request: &FetchRequest,
        mode: SignalMode,
        selected: &[SignalKind],
    ) -> Result<SymbolReport, ScanError> {
        let (series, provider, rows_fetched) = self.load(request)?;
        let (series, insufficient) = match self.config.pipeline().run(series.clone()) {
            Ok(decorated) => {
                let params = self.config.signal_params();
                (generate_flags(decorated, &params, selected, mode), None)
            }
            Err(e) => {
                warn!(
                    symbol = %request.symbol,
                    error = %e,
                    "indicators unavailable, flags forced false"
                );
                (all_false(series, selected, mode), Some(e))
            }
        };

        let signaling = is_signaling(&series, selected, mode);
        let last = series.len().saturating_sub(1);
        let fired = selected
            .iter()
            .copied()
            .filter(|k| series.signal(*k).is_some_and(|f| f.get(last).copied().unwrap_or(false)))
            .collect();

        Ok(SymbolReport {
            symbol: request.symbol.clone(),
            provider,
            rows_fetched,
            series,
            signaling,
            fired,
            insufficient,
        })
    }

    /// Analyze every symbol in order, isolating failures.
    pub fn scan(&self, request: &ScanRequest, progress: &dyn ScanProgress) -> ScanSummary {
        let total = request.symbols.len();
        let mut reports = Vec::new();
        let mut errors = Vec::new();

        for (i, symbol) in request.symbols.iter().enumerate() {
            progress.on_start(symbol, i, total);

            let fetch =
                FetchRequest::new(symbol.as_str(), request.start, request.end, request.resolution);
            let result = self.analyze(&fetch, request.mode, &request.selected);
            progress.on_complete(symbol, i, total, &result);

            match result {
                Ok(report) => {
                    if report.signaling {
                        info!(symbol = %symbol, fired = report.fired.len(), "signaling");
                    }
                    reports.push(report);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "symbol failed");
                    errors.push((symbol.clone(), e));
                }
            }
        }

        progress.on_batch_complete(reports.len(), errors.len(), total);
        ScanSummary {
            total,
            reports,
            errors,
        }
    }
}

/// Attach every selected catalog flag as all-false.
fn all_false(series: BarSeries, selected: &[SignalKind], mode: SignalMode) -> BarSeries {
    let n = series.len();
    selected
        .iter()
        .filter(|k| mode.contains(**k))
        .fold(series, |series, kind| series.with_signal(*kind, vec![false; n]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProvider, ProviderError};
    use crate::domain::Bar;
    use chrono::{Duration, NaiveDateTime};
    use std::cell::RefCell;

    /// Serves a fixed daily wave for known symbols and fails for the rest.
    struct WaveProvider {
        bars: usize,
    }

    impl DataProvider for WaveProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Polygon
        }

        fn supports(&self, _: Resolution) -> bool {
            true
        }

        fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
            if request.symbol == "BAD" {
                return Err(ProviderError::Api("unknown symbol".into()));
            }
            let start: NaiveDateTime = request.start.and_hms_opt(0, 0, 0).unwrap();
            let bars = (0..self.bars)
                .map(|i| {
                    let close = 100.0 + 10.0 * ((i as f64) * 0.3).sin();
                    Bar {
                        timestamp: start + Duration::days(i as i64),
                        open: close - 0.5,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1000.0 + i as f64,
                    }
                })
                .collect();
            Ok(BarSeries::new(request.symbol.clone(), request.resolution, bars))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl ScanProgress for Recorder {
        fn on_start(&self, symbol: &str, index: usize, total: usize) {
            self.events.borrow_mut().push(format!("start {symbol} {index}/{total}"));
        }

        fn on_complete(
            &self,
            symbol: &str,
            _: usize,
            _: usize,
            result: &Result<SymbolReport, ScanError>,
        ) {
            self.events
                .borrow_mut()
                .push(format!("done {symbol} ok={}", result.is_ok()));
        }

        fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
            self.events
                .borrow_mut()
                .push(format!("batch {succeeded}+{failed}/{total}"));
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn one_bad_symbol_does_not_abort_the_batch() {
        let fetcher =
            FallbackFetcher::default().with_provider(Box::new(WaveProvider { bars: 120 }));
        let config = FlowScanConfig::default();
        let scanner = Scanner::new(&fetcher, &config);
        let request = ScanRequest {
            symbols: vec!["AAA".into(), "BAD".into(), "CCC".into()],
            start: day(1),
            end: day(1),
            resolution: Resolution::Daily,
            mode: SignalMode::Buy,
            selected: vec![SignalKind::Hammer, SignalKind::PriceUp],
        };
        let recorder = Recorder::default();
        let summary = scanner.scan(&request, &recorder);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.errors[0].0, "BAD");
        assert!(matches!(summary.errors[0].1, ScanError::Fetch(_)));

        let events = recorder.events.borrow();
        assert_eq!(events.first().map(String::as_str), Some("start AAA 0/3"));
        assert_eq!(events.last().map(String::as_str), Some("batch 2+1/3"));
    }

    #[test]
    fn analyze_attaches_only_selected_flags() {
        let fetcher =
            FallbackFetcher::default().with_provider(Box::new(WaveProvider { bars: 120 }));
        let config = FlowScanConfig::default();
        let scanner = Scanner::new(&fetcher, &config);
        let request = FetchRequest::new("AAA", day(1), day(1), Resolution::Daily);

        let report = scanner
            .analyze(&request, SignalMode::Sell, &[SignalKind::ObvBearishDivergence])
            .unwrap();
        assert_eq!(report.provider, ProviderId::Polygon);
        assert_eq!(report.rows_fetched, 120);
        assert_eq!(report.series.signals().count(), 1);
        assert!(report.series.signal(SignalKind::ObvBearishDivergence).is_some());
    }

    #[test]
    fn short_history_forces_flags_false() {
        let fetcher = FallbackFetcher::default().with_provider(Box::new(WaveProvider { bars: 30 }));
        let config = FlowScanConfig::default();
        let scanner = Scanner::new(&fetcher, &config);
        let request = FetchRequest::new("AAA", day(1), day(1), Resolution::Daily);

        let selected = [SignalKind::PriceUp, SignalKind::Hammer];
        let report = scanner.analyze(&request, SignalMode::Buy, &selected).unwrap();
        assert!(matches!(
            report.insufficient,
            Some(IndicatorError::InsufficientData { available: 30, .. })
        ));
        assert_eq!(report.series.len(), 30);
        assert!(!report.signaling);
        assert!(report.fired.is_empty());
        assert!(report.series.signal(SignalKind::PriceUp).unwrap().iter().all(|f| !f));
    }

    #[test]
    fn empty_hourly_is_no_data() {
        let fetcher = FallbackFetcher::default();
        let config = FlowScanConfig::default();
        let scanner = Scanner::new(&fetcher, &config);
        let request = FetchRequest::new("AAA", day(2), day(5), Resolution::Hourly);
        assert!(matches!(
            scanner.analyze(&request, SignalMode::Buy, &[]),
            Err(ScanError::NoData { .. })
        ));
    }
}
