//! Data provider trait and structured error types.
//!
//! The `DataProvider` trait abstracts over the REST market-data vendors so the
//! fallback fetcher can walk an ordered registry of them and tests can substitute mocks.

use crate::domain::{BarSeries, Resolution};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a supported market-data vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "alpaca")]
    Alpaca,
    #[serde(rename = "finnhub")]
    Finnhub,
    #[serde(rename = "polygon")]
    Polygon,
    #[serde(rename = "twelvedata")]
    TwelveData,
    #[serde(rename = "fmp")]
    Fmp,
    #[serde(rename = "alpha_vantage")]
    AlphaVantage,
    #[serde(rename = "eodhd")]
    Eodhd,
    #[serde(rename = "marketstack")]
    Marketstack,
}

impl ProviderId {
    pub const ALL: [ProviderId; 8] = [
        ProviderId::Alpaca,
        ProviderId::Finnhub,
        ProviderId::Polygon,
        ProviderId::TwelveData,
        ProviderId::Fmp,
        ProviderId::AlphaVantage,
        ProviderId::Eodhd,
        ProviderId::Marketstack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpaca => "alpaca",
            Self::Finnhub => "finnhub",
            Self::Polygon => "polygon",
            Self::TwelveData => "twelvedata",
            Self::Fmp => "fmp",
            Self::AlphaVantage => "alpha_vantage",
            Self::Eodhd => "eodhd",
            Self::Marketstack => "marketstack",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Self::Alpaca => "ALPACA_KEY",
            Self::Finnhub => "FINNHUB_KEY",
            Self::Polygon => "POLYGON_KEY",
            Self::TwelveData => "TWELVEDATA_KEY",
            Self::Fmp => "FMP_KEY",
            Self::AlphaVantage => "ALPHA_VANTAGE_KEY",
            Self::Eodhd => "EODHD_KEY",
            Self::Marketstack => "MARKETSTACK_KEY",
        }
    }

    /// Environment variable holding the secret half of a key pair, for vendors that use one.
    pub fn secret_var(&self) -> Option<&'static str> {
        match self {
            Self::Alpaca => Some("ALPACA_SECRET"),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| format!("unknown provider '{s}'"))
    }
}

/// One request for bars of a single symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolution: Resolution,
}

impl FetchRequest {
    pub fn new(
        symbol: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            resolution,
        }
    }

    /// Whether a date falls inside the inclusive requested range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Failure of a single provider adapter.
///
/// Always recoverable by the fallback fetcher: it logs the error and moves on.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response format changed: {0}")]
    Malformed(String),

    #[error("missing field '{0}' in response")]
    MissingField(String),

    #[error("provider rejected request: {0}")]
    Api(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{provider} does not serve {resolution} bars")]
    Unsupported {
        provider: ProviderId,
        resolution: Resolution,
    },

    #[error("no credential configured for {0}")]
    MissingCredential(ProviderId),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // Query strings carry API keys; the request URL must not reach the message.
        let e = e.without_url();
        if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Trait for market-data vendors.
///
/// Implementations translate a [`FetchRequest`] into the vendor's wire format and
/// normalize the response into a canonical [`BarSeries`]. They issue blocking requests
/// and never retry.
pub trait DataProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Whether this vendor can serve bars at the given resolution.
    fn supports(&self, resolution: Resolution) -> bool;

    /// Fetch bars for one symbol over an inclusive date range.
    ///
    /// An empty series is a legal answer (e.g. the vendor rejects the range silently).
    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError>;
}
