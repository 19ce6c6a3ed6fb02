//! Financial Modeling Prep.
//!
//! Daily history comes wrapped in a `historical` array (newest first). The hourly chart
//! is a bare array whose timestamps are US/Eastern wall-clock times.

use super::{bar, into_series};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{eastern_to_utc, parse_timestamp, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

#[derive(Debug, Deserialize)]
pub(crate) struct HistoricalResponse {
    historical: Option<Vec<FmpRow>>,
    #[serde(rename = "Error Message")]
    error: Option<String>,
}

/// The chart endpoint answers with an array on success and an object on failure.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChartResponse {
    Rows(Vec<FmpRow>),
    Error {
        #[serde(rename = "Error Message")]
        error: String,
    },
}

#[derive(Debug, Deserialize)]
struct FmpRow {
    date: String,
    open: Option<Numeric>,
    high: Option<Numeric>,
    low: Option<Numeric>,
    close: Option<Numeric>,
    volume: Option<Numeric>,
}

pub struct FmpProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl FmpProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let base = match request.resolution {
            Resolution::Daily => format!("{BASE_URL}/historical-price-full/{}", request.symbol),
            Resolution::Hourly => format!("{BASE_URL}/historical-chart/1hour/{}", request.symbol),
        };
        url_with_params(
            &base,
            &[
                ("from", request.start.to_string()),
                ("to", request.end.to_string()),
                ("apikey", api_key.to_string()),
            ],
        )
    }

    pub(crate) fn parse_historical(resp: HistoricalResponse) -> Result<Vec<Bar>, ProviderError> {
        if let Some(error) = resp.error {
            return Err(ProviderError::Api(error));
        }
        // Unknown symbols come back as `{}`.
        let rows = resp.historical.unwrap_or_default();
        rows.iter().map(|r| Self::row(r, false)).collect()
    }

    pub(crate) fn parse_chart(resp: ChartResponse) -> Result<Vec<Bar>, ProviderError> {
        match resp {
            ChartResponse::Rows(rows) => rows.iter().map(|r| Self::row(r, true)).collect(),
            ChartResponse::Error { error } => Err(ProviderError::Api(error)),
        }
    }

    fn row(row: &FmpRow, eastern: bool) -> Result<Bar, ProviderError> {
        let invalid = || ProviderError::Malformed(format!("invalid date: {}", row.date));
        let mut ts = parse_timestamp(&row.date).ok_or_else(invalid)?;
        if eastern {
            ts = eastern_to_utc(ts).ok_or_else(invalid)?;
        }
        Ok(bar(ts, &row.open, &row.high, &row.low, &row.close, &row.volume))
    }
}

impl DataProvider for FmpProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Fmp
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let bars = match request.resolution {
            Resolution::Daily => Self::parse_historical(self.http.get_json(url, &[])?)?,
            Resolution::Hourly => Self::parse_chart(self.http.get_json(url, &[])?)?,
        };
        Ok(into_series(request, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::providers::fixtures::{daily_request, hourly_request, ts};

    #[test]
    fn url_picks_endpoint_by_resolution() {
        let daily = FmpProvider::bars_url(&daily_request(), "k").unwrap();
        assert_eq!(daily.path(), "/api/v3/historical-price-full/AAPL");
        assert!(daily.query().unwrap().contains("from=2024-01-02"));

        let hourly = FmpProvider::bars_url(&hourly_request(), "k").unwrap();
        assert_eq!(hourly.path(), "/api/v3/historical-chart/1hour/AAPL");
    }

    #[test]
    fn parses_historical_newest_first() {
        let json = r#"{
            "symbol": "AAPL",
            "historical": [
                {"date": "2024-01-03", "open": 184.22, "high": 185.88, "low": 183.43, "close": 184.25, "adjClose": 184.25, "volume": 58414460},
                {"date": "2024-01-02", "open": 187.15, "high": 188.44, "low": 183.89, "close": 185.64, "adjClose": 185.64, "volume": 82488674}
            ]
        }"#;
        let bars = FmpProvider::parse_historical(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].timestamp, ts(2024, 1, 2, 0));

        let series = into_series(&daily_request(), bars);
        assert_eq!(series.bars()[0].close, 185.64);
    }

    #[test]
    fn empty_object_is_empty_history() {
        let bars = FmpProvider::parse_historical(serde_json::from_str("{}").unwrap()).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn hourly_chart_is_converted_from_eastern() {
        let json = r#"[
            {"date": "2024-01-02 10:00:00", "open": 185.0, "low": 184.9, "high": 186.0, "close": 185.5, "volume": 1200}
        ]"#;
        let bars = FmpProvider::parse_chart(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(bars[0].timestamp, ts(2024, 1, 2, 15));
    }

    #[test]
    fn chart_error_object_is_reported() {
        let json = r#"{"Error Message": "Invalid API KEY."}"#;
        assert!(matches!(
            FmpProvider::parse_chart(serde_json::from_str(json).unwrap()),
            Err(ProviderError::Api(_))
        ));
    }
}
