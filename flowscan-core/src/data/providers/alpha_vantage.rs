//! Alpha Vantage time series.
//!
//! The API has no date-range parameters, so the full history is requested and sliced
//! client-side. Intraday keys are US/Eastern wall-clock times.

use super::{bar, into_series};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{eastern_to_utc, parse_timestamp, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;

const BASE_URL: &str = "https://www.alphavantage.co/query";

const DAILY_KEY: &str = "Time Series (Daily)";
const HOURLY_KEY: &str = "Time Series (60min)";

#[derive(Debug, Deserialize)]
pub(crate) struct SeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    daily: Option<BTreeMap<String, Point>>,
    #[serde(rename = "Time Series (60min)")]
    hourly: Option<BTreeMap<String, Point>>,
    #[serde(rename = "Error Message")]
    error: Option<String>,
    /// Rate-limit notice.
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Point {
    #[serde(rename = "1. open")]
    open: Option<Numeric>,
    #[serde(rename = "2. high")]
    high: Option<Numeric>,
    #[serde(rename = "3. low")]
    low: Option<Numeric>,
    #[serde(rename = "4. close")]
    close: Option<Numeric>,
    #[serde(rename = "5. volume")]
    volume: Option<Numeric>,
}

pub struct AlphaVantageProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl AlphaVantageProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let mut params = vec![("symbol", request.symbol.clone())];
        match request.resolution {
            Resolution::Daily => params.push(("function", "TIME_SERIES_DAILY".to_string())),
            Resolution::Hourly => {
                params.push(("function", "TIME_SERIES_INTRADAY".to_string()));
                params.push(("interval", "60min".to_string()));
            }
        }
        params.push(("outputsize", "full".to_string()));
        params.push(("apikey", api_key.to_string()));
        url_with_params(BASE_URL, &params)
    }

    pub(crate) fn parse_series(
        resp: SeriesResponse,
        resolution: Resolution,
    ) -> Result<Vec<Bar>, ProviderError> {
        let (points, key) = match resolution {
            Resolution::Daily => (resp.daily, DAILY_KEY),
            Resolution::Hourly => (resp.hourly, HOURLY_KEY),
        };
        let Some(points) = points else {
            return Err(match resp.error.or(resp.note).or(resp.information) {
                Some(reason) => ProviderError::Api(reason),
                None => ProviderError::MissingField(key.to_string()),
            });
        };

        points
            .iter()
            .map(|(stamp, p)| {
                let invalid =
                    || ProviderError::Malformed(format!("invalid timestamp key: {stamp}"));
                let mut ts = parse_timestamp(stamp).ok_or_else(invalid)?;
                if resolution == Resolution::Hourly {
                    ts = eastern_to_utc(ts).ok_or_else(invalid)?;
                }
                Ok(bar(ts, &p.open, &p.high, &p.low, &p.close, &p.volume))
            })
            .collect()
    }
}

impl DataProvider for AlphaVantageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::AlphaVantage
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let resp: SeriesResponse = self.http.get_json(url, &[])?;
        let bars = Self::parse_series(resp, request.resolution)?;
        Ok(into_series(request, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::providers::fixtures::{daily_request, hourly_request, ts};

    #[test]
    fn url_requests_full_output() {
        let daily = AlphaVantageProvider::bars_url(&daily_request(), "k").unwrap();
        let query = daily.query().unwrap();
        assert!(query.contains("function=TIME_SERIES_DAILY"));
        assert!(query.contains("outputsize=full"));
        assert!(!query.contains("interval"));

        let hourly = AlphaVantageProvider::bars_url(&hourly_request(), "k").unwrap();
        assert!(hourly.query().unwrap().contains("interval=60min"));
    }

    #[test]
    fn full_history_is_sliced_to_the_request() {
        let json = r#"{
            "Meta Data": {"2. Symbol": "AAPL"},
            "Time Series (Daily)": {
                "2024-01-08": {"1. open": "182.09", "2. high": "185.60", "3. low": "181.50", "4. close": "185.56", "5. volume": "59144470"},
                "2024-01-03": {"1. open": "184.22", "2. high": "185.88", "3. low": "183.43", "4. close": "184.25", "5. volume": "58414460"},
                "2024-01-02": {"1. open": "187.15", "2. high": "188.44", "3. low": "183.89", "4. close": "185.64", "5. volume": "82488674"},
                "2023-12-29": {"1. open": "193.90", "2. high": "194.40", "3. low": "191.73", "4. close": "192.53", "5. volume": "42628802"}
            }
        }"#;
        let resp = serde_json::from_str(json).unwrap();
        let bars = AlphaVantageProvider::parse_series(resp, Resolution::Daily).unwrap();
        assert_eq!(bars.len(), 4);

        let series = into_series(&daily_request(), bars);
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].timestamp, ts(2024, 1, 2, 0));
        assert_eq!(series.bars()[1].volume, 58_414_460.0);
    }

    #[test]
    fn intraday_keys_are_eastern() {
        let json = r#"{
            "Time Series (60min)": {
                "2024-01-02 10:00:00": {"1. open": "185.0", "2. high": "186.0", "3. low": "184.9", "4. close": "185.5", "5. volume": "1200"}
            }
        }"#;
        let resp = serde_json::from_str(json).unwrap();
        let bars = AlphaVantageProvider::parse_series(resp, Resolution::Hourly).unwrap();
        assert_eq!(bars[0].timestamp, ts(2024, 1, 2, 15));
    }

    #[test]
    fn rate_limit_note_is_an_api_error() {
        let json = r#"{"Note": "Our standard API call frequency is 5 calls per minute."}"#;
        let resp = serde_json::from_str(json).unwrap();
        let err = AlphaVantageProvider::parse_series(resp, Resolution::Daily).unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }

    #[test]
    fn missing_series_key_is_reported() {
        let resp = serde_json::from_str("{}").unwrap();
        let err = AlphaVantageProvider::parse_series(resp, Resolution::Hourly).unwrap_err();
        assert!(matches!(err, ProviderError::MissingField(k) if k == HOURLY_KEY));
    }
}
