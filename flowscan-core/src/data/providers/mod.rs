//! REST adapters, one per vendor.
//!
//! Each adapter splits into three pieces so the wire handling can be tested offline:
//! - `bars_url` builds the request for a [`FetchRequest`]
//! - `parse_*` decodes the vendor payload into canonical [`Bar`]s
//! - `DataProvider::fetch` glues them together over the shared [`HttpClient`]

pub mod alpaca;
pub mod alpha_vantage;
pub mod eodhd;
pub mod finnhub;
pub mod fmp;
pub mod marketstack;
pub mod polygon;
pub mod twelvedata;

pub use alpaca::AlpacaProvider;
pub use alpha_vantage::AlphaVantageProvider;
pub use eodhd::EodhdProvider;
pub use finnhub::FinnhubProvider;
pub use fmp::FmpProvider;
pub use marketstack::MarketstackProvider;
pub use polygon::PolygonProvider;
pub use twelvedata::TwelveDataProvider;

use super::credentials::Credentials;
use super::http::HttpClient;
use super::normalize::{align_to_resolution, price, volume, Numeric};
use super::provider::{DataProvider, FetchRequest, ProviderId};
use crate::domain::{Bar, BarSeries};
use chrono::{NaiveDateTime, NaiveTime};

/// Build the adapter for `id`, if a credential for it is configured.
pub fn build_provider(
    id: ProviderId,
    credentials: &Credentials,
    http: &HttpClient,
) -> Option<Box<dyn DataProvider>> {
    let credential = credentials.get(id)?;
    let http = http.clone();
    let key = credential.key();
    let provider: Box<dyn DataProvider> = match id {
        ProviderId::Alpaca => Box::new(AlpacaProvider::new(http, key, credential.secret()?)),
        ProviderId::Finnhub => Box::new(FinnhubProvider::new(http, key)),
        ProviderId::Polygon => Box::new(PolygonProvider::new(http, key)),
        ProviderId::TwelveData => Box::new(TwelveDataProvider::new(http, key)),
        ProviderId::Fmp => Box::new(FmpProvider::new(http, key)),
        ProviderId::AlphaVantage => Box::new(AlphaVantageProvider::new(http, key)),
        ProviderId::Eodhd => Box::new(EodhdProvider::new(http, key)),
        ProviderId::Marketstack => Box::new(MarketstackProvider::new(http, key)),
    };
    Some(provider)
}

/// Canonical bar from coerced vendor fields.
pub(crate) fn bar(
    timestamp: NaiveDateTime,
    open: &Option<Numeric>,
    high: &Option<Numeric>,
    low: &Option<Numeric>,
    close: &Option<Numeric>,
    vol: &Option<Numeric>,
) -> Bar {
    Bar {
        timestamp,
        open: price(open),
        high: price(high),
        low: price(low),
        close: price(close),
        volume: volume(vol),
    }
}

/// Align timestamps to the resolution, keep only rows inside the requested dates,
/// and hand the rows to [`BarSeries::new`] for sorting and de-duplication.
///
/// This is also the client-side slice for vendors that ignore server-side ranges.
pub(crate) fn into_series(request: &FetchRequest, bars: Vec<Bar>) -> BarSeries {
    let bars = bars
        .into_iter()
        .map(|mut b| {
            b.timestamp = align_to_resolution(b.timestamp, request.resolution);
            b
        })
        .filter(|b| request.contains(b.date()))
        .collect();
    BarSeries::new(request.symbol.clone(), request.resolution, bars)
}

/// Epoch seconds at 00:00:00 UTC of the request start.
pub(crate) fn start_epoch(request: &FetchRequest) -> i64 {
    request.start.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Epoch seconds at 23:59:59 UTC of the request end, so the end date is inclusive.
pub(crate) fn end_epoch(request: &FetchRequest) -> i64 {
    request
        .end
        .and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_else(|| request.end.and_time(NaiveTime::MIN).and_utc().timestamp())
}
