//! Marketstack end-of-day and intraday bars.
//!
//! Dates come as `2024-01-02T00:00:00+0000`; only the date part matters for daily bars.

use super::{bar, into_series};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{parse_timestamp, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// The free tier only serves plain HTTP.
const BASE_URL: &str = "http://api.marketstack.com/v1";

#[derive(Debug, Deserialize)]
pub(crate) struct MarketstackResponse {
    data: Option<Vec<Row>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Row {
    date: String,
    open: Option<Numeric>,
    high: Option<Numeric>,
    low: Option<Numeric>,
    close: Option<Numeric>,
    volume: Option<Numeric>,
}

pub struct MarketstackProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl MarketstackProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let mut params = vec![
            ("access_key", api_key.to_string()),
            ("symbols", request.symbol.clone()),
            ("date_from", request.start.to_string()),
            ("date_to", request.end.to_string()),
            ("limit", "1000".to_string()),
        ];
        let endpoint = match request.resolution {
            Resolution::Daily => "eod",
            Resolution::Hourly => {
                params.push(("interval", "1hour".to_string()));
                "intraday"
            }
        };
        url_with_params(&format!("{BASE_URL}/{endpoint}"), &params)
    }

    pub(crate) fn parse_data(resp: MarketstackResponse) -> Result<Vec<Bar>, ProviderError> {
        if let Some(err) = resp.error {
            let reason = match (err.code, err.message) {
                (Some(code), Some(msg)) => format!("{code}: {msg}"),
                (code, msg) => code.or(msg).unwrap_or_else(|| "unknown error".to_string()),
            };
            return Err(ProviderError::Api(reason));
        }
        let rows = resp.data.ok_or_else(|| ProviderError::MissingField("data".into()))?;

        rows.iter()
            .map(|row| {
                let ts = parse_timestamp(&row.date)
                    .ok_or_else(|| {
                        ProviderError::Malformed(format!("invalid date: {}", row.date))
                    })?;
                Ok(bar(ts, &row.open, &row.high, &row.low, &row.close, &row.volume))
            })
            .collect()
    }
}

impl DataProvider for MarketstackProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Marketstack
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let resp: MarketstackResponse = self.http.get_json(url, &[])?;
        Ok(into_series(request, Self::parse_data(resp)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::providers::fixtures::{daily_request, hourly_request, ts};

    #[test]
    fn url_picks_endpoint_and_interval() {
        let daily = MarketstackProvider::bars_url(&daily_request(), "k").unwrap();
        assert_eq!(daily.path(), "/v1/eod");
        assert!(daily.query().unwrap().contains("symbols=AAPL"));

        let hourly = MarketstackProvider::bars_url(&hourly_request(), "k").unwrap();
        assert_eq!(hourly.path(), "/v1/intraday");
        assert!(hourly.query().unwrap().contains("interval=1hour"));
    }

    #[test]
    fn daily_dates_truncate_to_midnight() {
        let json = r#"{
            "pagination": {"limit": 1000, "offset": 0, "count": 1, "total": 1},
            "data": [
                {"open": 187.15, "high": 188.44, "low": 183.89, "close": 185.64, "volume": 82488674.0, "symbol": "AAPL", "exchange": "XNAS", "date": "2024-01-02T00:00:00+0000"}
            ]
        }"#;
        let bars = MarketstackProvider::parse_data(serde_json::from_str(json).unwrap()).unwrap();
        let series = into_series(&daily_request(), bars);
        assert_eq!(series.bars()[0].timestamp, ts(2024, 1, 2, 0));
        assert_eq!(series.bars()[0].volume, 82_488_674.0);
    }

    #[test]
    fn error_object_is_reported() {
        let json =
            r#"{"error": {"code": "invalid_access_key", "message": "No valid API Access Key."}}"#;
        let err = MarketstackProvider::parse_data(serde_json::from_str(json).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::Api(m) if m.starts_with("invalid_access_key")));
    }
}
