//! Fallback fetcher: walk an ordered provider list until one returns data.
//!
//! The first non-empty success wins; results are never merged across providers.
//! Provider failures are logged and recorded, never propagated mid-chain.

use super::credentials::Credentials;
use super::http::HttpClient;
use super::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use super::providers::build_provider;
use crate::config::ProvidersConfig;
use crate::domain::{BarSeries, Resolution};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_DAILY_ORDER: [ProviderId; 8] = [
    ProviderId::Alpaca,
    ProviderId::Finnhub,
    ProviderId::Polygon,
    ProviderId::TwelveData,
    ProviderId::Fmp,
    ProviderId::AlphaVantage,
    ProviderId::Eodhd,
    ProviderId::Marketstack,
];

pub const DEFAULT_HOURLY_ORDER: [ProviderId; 8] = [
    ProviderId::Alpaca,
    ProviderId::Polygon,
    ProviderId::TwelveData,
    ProviderId::Finnhub,
    ProviderId::Fmp,
    ProviderId::Eodhd,
    ProviderId::Marketstack,
    ProviderId::AlphaVantage,
];

/// Why a provider in the order was passed over without a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No adapter registered, i.e. no credential configured.
    NotConfigured,
    Unsupported,
}

/// What happened when the fetcher reached one provider.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success { rows: usize },
    Empty,
    Failed(ProviderError),
    Skipped(SkipReason),
}

#[derive(Debug)]
pub struct ProviderAttempt {
    pub provider: ProviderId,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Success { rows } => write!(f, "{}: {rows} rows", self.provider),
            AttemptOutcome::Empty => write!(f, "{}: empty", self.provider),
            AttemptOutcome::Failed(e) => write!(f, "{}: {e}", self.provider),
            AttemptOutcome::Skipped(SkipReason::NotConfigured) => {
                write!(f, "{}: skipped (no credential)", self.provider)
            }
            AttemptOutcome::Skipped(SkipReason::Unsupported) => {
                write!(f, "{}: skipped (resolution unsupported)", self.provider)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no provider returned {resolution} data for {symbol} ({} providers tried)", attempted(.attempts))]
    AllProvidersExhausted {
        symbol: String,
        resolution: Resolution,
        attempts: Vec<ProviderAttempt>,
    },
}

fn attempted(attempts: &[ProviderAttempt]) -> usize {
    attempts
        .iter()
        .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped(_)))
        .count()
}

/// Result of one walk over the provider order.
#[derive(Debug)]
pub struct FetchOutcome {
    pub series: BarSeries,
    /// The provider whose output was kept, if any.
    pub provider: Option<ProviderId>,
    pub attempts: Vec<ProviderAttempt>,
}

/// Registry of typed adapters plus an ordered provider list per resolution.
pub struct FallbackFetcher {
    registry: HashMap<ProviderId, Box<dyn DataProvider>>,
    daily_order: Vec<ProviderId>,
    hourly_order: Vec<ProviderId>,
}

impl Default for FallbackFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_ORDER.to_vec(), DEFAULT_HOURLY_ORDER.to_vec())
    }
}

impl FallbackFetcher {
    /// An empty registry with the given orders. Register adapters with [`register`](Self::register).
    pub fn new(daily_order: Vec<ProviderId>, hourly_order: Vec<ProviderId>) -> Self {
        Self {
            registry: HashMap::new(),
            daily_order,
            hourly_order,
        }
    }

    /// Build the real adapters for every configured credential.
    pub fn from_config(
        config: &ProvidersConfig,
        credentials: &Credentials,
    ) -> Result<Self, ProviderError> {
        let http = HttpClient::new(Duration::from_secs(config.timeout_secs))?;
        let mut fetcher = Self::new(config.daily.clone(), config.hourly.clone());
        for id in ProviderId::ALL {
            match build_provider(id, credentials, &http) {
                Some(provider) => fetcher.register(provider),
                None => debug!(provider = %id, "no credential, provider disabled"),
            }
        }
        Ok(fetcher)
    }

    /// Register (or replace) the adapter for its id.
    pub fn register(&mut self, provider: Box<dyn DataProvider>) {
        self.registry.insert(provider.id(), provider);
    }

    pub fn with_provider(mut self, provider: Box<dyn DataProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn is_registered(&self, id: ProviderId) -> bool {
        self.registry.contains_key(&id)
    }

    pub fn order(&self, resolution: Resolution) -> &[ProviderId] {
        match resolution {
            Resolution::Daily => &self.daily_order,
            Resolution::Hourly => &self.hourly_order,
        }
    }

    /// Walk the order for the request's resolution and keep the first non-empty series.
    ///
    /// Never fails: exhaustion is an empty series with `provider == None`.
    pub fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let mut attempts = Vec::new();

        for &id in self.order(request.resolution) {
            let Some(provider) = self.registry.get(&id) else {
                debug!(provider = %id, "skipping provider without credential");
                attempts.push(ProviderAttempt {
                    provider: id,
                    outcome: AttemptOutcome::Skipped(SkipReason::NotConfigured),
                });
                continue;
            };
            if !provider.supports(request.resolution) {
                debug!(
                    provider = %id,
                    resolution = %request.resolution,
                    "skipping unsupported provider"
                );
                attempts.push(ProviderAttempt {
                    provider: id,
                    outcome: AttemptOutcome::Skipped(SkipReason::Unsupported),
                });
                continue;
            }

            debug!(
                provider = %id,
                symbol = %request.symbol,
                resolution = %request.resolution,
                "attempting"
            );
            match provider.fetch(request) {
                Ok(series) if !series.is_empty() => {
                    info!(provider = %id, symbol = %request.symbol, rows = series.len(), "fetched");
                    attempts.push(ProviderAttempt {
                        provider: id,
                        outcome: AttemptOutcome::Success { rows: series.len() },
                    });
                    return FetchOutcome {
                        series,
                        provider: Some(id),
                        attempts,
                    };
                }
                Ok(_) => {
                    debug!(provider = %id, symbol = %request.symbol, "empty result");
                    attempts.push(ProviderAttempt {
                        provider: id,
                        outcome: AttemptOutcome::Empty,
                    });
                }
                Err(e) => {
                    warn!(provider = %id, symbol = %request.symbol, error = %e, "provider failed");
                    attempts.push(ProviderAttempt {
                        provider: id,
                        outcome: AttemptOutcome::Failed(e),
                    });
                }
            }
        }

        warn!(
            symbol = %request.symbol,
            resolution = %request.resolution,
            "all providers exhausted"
        );
        FetchOutcome {
            series: BarSeries::empty(request.symbol.clone(), request.resolution),
            provider: None,
            attempts,
        }
    }

    /// Daily bars; exhausting every provider is an error.
    pub fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, FetchError> {
        let request = FetchRequest::new(symbol, start, end, Resolution::Daily);
        let outcome = self.fetch(&request);
        if outcome.provider.is_none() {
            return Err(FetchError::AllProvidersExhausted {
                symbol: request.symbol,
                resolution: Resolution::Daily,
                attempts: outcome.attempts,
            });
        }
        Ok(outcome.series)
    }

    /// Hourly bars; exhausting every provider yields an empty series.
    pub fn fetch_hourly(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> BarSeries {
        let request = FetchRequest::new(symbol, start, end, Resolution::Hourly);
        self.fetch(&request).series
    }

    /// Query exactly one provider, surfacing its error directly.
    pub fn fetch_from(
        &self,
        id: ProviderId,
        request: &FetchRequest,
    ) -> Result<BarSeries, ProviderError> {
        let provider = self
            .registry
            .get(&id)
            .ok_or(ProviderError::MissingCredential(id))?;
        if !provider.supports(request.resolution) {
            return Err(ProviderError::Unsupported {
                provider: id,
                resolution: request.resolution,
            });
        }
        provider.fetch(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Behavior {
        Bars(usize),
        Empty,
        Fail,
    }

    struct Scripted {
        id: ProviderId,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
        hourly: bool,
    }

    impl DataProvider for Scripted {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn supports(&self, resolution: Resolution) -> bool {
            resolution == Resolution::Daily || self.hourly
        }

        fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Bars(n) => {
                    let bars = (0..n)
                        .map(|i| Bar {
                            timestamp: request.start.and_hms_opt(0, 0, 0).unwrap()
                                + chrono::Duration::days(i as i64),
                            open: 1.0,
                            high: 1.0,
                            low: 1.0,
                            close: 1.0,
                            volume: 1.0,
                        })
                        .collect();
                    Ok(BarSeries::new(request.symbol.clone(), request.resolution, bars))
                }
                Behavior::Empty => Ok(BarSeries::empty(request.symbol.clone(), request.resolution)),
                Behavior::Fail => Err(ProviderError::Network("connection refused".into())),
            }
        }
    }

    fn scripted(id: ProviderId, behavior: Behavior) -> (Box<dyn DataProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Scripted {
            id,
            behavior,
            calls: Arc::clone(&calls),
            hourly: true,
        };
        (Box::new(provider), calls)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn first_non_empty_provider_wins() {
        let (a, a_calls) = scripted(ProviderId::Alpaca, Behavior::Fail);
        let (b, b_calls) = scripted(ProviderId::Finnhub, Behavior::Empty);
        let (c, c_calls) = scripted(ProviderId::Polygon, Behavior::Bars(3));
        let (d, d_calls) = scripted(ProviderId::TwelveData, Behavior::Bars(5));
        let fetcher = FallbackFetcher::default()
            .with_provider(a)
            .with_provider(b)
            .with_provider(c)
            .with_provider(d);

        let series = fetcher.fetch_daily("AAPL", day(2), day(10)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 1);
        assert_eq!(d_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn daily_exhaustion_reports_every_provider() {
        let (a, _) = scripted(ProviderId::Alpaca, Behavior::Fail);
        let (b, _) = scripted(ProviderId::Polygon, Behavior::Empty);
        let fetcher = FallbackFetcher::default().with_provider(a).with_provider(b);

        let err = fetcher.fetch_daily("AAPL", day(2), day(5)).unwrap_err();
        let FetchError::AllProvidersExhausted {
            symbol,
            resolution,
            attempts,
        } = err;
        assert_eq!(symbol, "AAPL");
        assert_eq!(resolution, Resolution::Daily);
        assert_eq!(attempts.len(), DEFAULT_DAILY_ORDER.len());
        assert!(matches!(attempts[0].outcome, AttemptOutcome::Failed(_)));
        assert!(matches!(attempts[1].outcome, AttemptOutcome::Skipped(SkipReason::NotConfigured)));
        assert!(matches!(attempts[2].outcome, AttemptOutcome::Empty));
        assert_eq!(attempted(&attempts), 2);
    }

    #[test]
    fn hourly_exhaustion_is_empty_not_error() {
        let (a, _) = scripted(ProviderId::Alpaca, Behavior::Fail);
        let fetcher = FallbackFetcher::default().with_provider(a);
        let series = fetcher.fetch_hourly("AAPL", day(2), day(5));
        assert!(series.is_empty());
        assert_eq!(series.resolution(), Resolution::Hourly);
    }

    #[test]
    fn unsupported_resolution_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let daily_only = Scripted {
            id: ProviderId::Alpaca,
            behavior: Behavior::Bars(2),
            calls: Arc::clone(&calls),
            hourly: false,
        };
        let fetcher = FallbackFetcher::default().with_provider(Box::new(daily_only));
        let outcome = fetcher.fetch(&FetchRequest::new("AAPL", day(2), day(5), Resolution::Hourly));
        assert!(outcome.provider.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Skipped(SkipReason::Unsupported)
        ));
    }

    #[test]
    fn fetch_from_surfaces_provider_errors() {
        let (a, _) = scripted(ProviderId::Alpaca, Behavior::Fail);
        let fetcher = FallbackFetcher::default().with_provider(a);
        let req = FetchRequest::new("AAPL", day(2), day(5), Resolution::Daily);

        assert!(matches!(
            fetcher.fetch_from(ProviderId::Alpaca, &req),
            Err(ProviderError::Network(_))
        ));
        assert!(matches!(
            fetcher.fetch_from(ProviderId::Eodhd, &req),
            Err(ProviderError::MissingCredential(ProviderId::Eodhd))
        ));
    }

    #[test]
    fn hourly_order_differs_from_daily() {
        let fetcher = FallbackFetcher::default();
        assert_eq!(fetcher.order(Resolution::Hourly)[1], ProviderId::Polygon);
        assert_eq!(fetcher.order(Resolution::Daily)[1], ProviderId::Finnhub);
        assert_eq!(fetcher.order(Resolution::Hourly).last(), Some(&ProviderId::AlphaVantage));
    }

    #[test]
    fn attempt_display_is_readable() {
        let attempt = ProviderAttempt {
            provider: ProviderId::Fmp,
            outcome: AttemptOutcome::Skipped(SkipReason::NotConfigured),
        };
        assert_eq!(attempt.to_string(), "fmp: skipped (no credential)");
    }
}
