//! Twelve Data time series. Every numeric field arrives as a string.

use super::{bar, into_series};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{parse_timestamp, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const BASE_URL: &str = "https://api.twelvedata.com/time_series";

#[derive(Debug, Deserialize)]
pub(crate) struct TimeSeriesResponse {
    status: Option<String>,
    values: Option<Vec<Value>>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Value {
    datetime: String,
    open: Option<Numeric>,
    high: Option<Numeric>,
    low: Option<Numeric>,
    close: Option<Numeric>,
    volume: Option<Numeric>,
}

pub struct TwelveDataProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl TwelveDataProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let interval = match request.resolution {
            Resolution::Daily => "1day",
            Resolution::Hourly => "1h",
        };
        url_with_params(
            BASE_URL,
            &[
                ("symbol", request.symbol.clone()),
                ("interval", interval.to_string()),
                ("start_date", format!("{} 00:00:00", request.start)),
                ("end_date", format!("{} 23:59:59", request.end)),
                ("timezone", "UTC".to_string()),
                ("order", "ASC".to_string()),
                ("outputsize", "5000".to_string()),
                ("apikey", api_key.to_string()),
            ],
        )
    }

    pub(crate) fn parse_values(resp: TimeSeriesResponse) -> Result<Vec<Bar>, ProviderError> {
        if resp.status.as_deref() == Some("error") {
            return Err(ProviderError::Api(
                resp.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let values = resp
            .values
            .ok_or_else(|| ProviderError::MissingField("values".into()))?;

        values
            .iter()
            .map(|v| {
                let ts = parse_timestamp(&v.datetime)
                    .ok_or_else(|| {
                        ProviderError::Malformed(format!("invalid datetime: {}", v.datetime))
                    })?;
                Ok(bar(ts, &v.open, &v.high, &v.low, &v.close, &v.volume))
            })
            .collect()
    }
}

impl DataProvider for TwelveDataProvider {
    fn id(&self) -> ProviderId {
        ProviderId::TwelveData
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let resp: TimeSeriesResponse = self.http.get_json(url, &[])?;
        Ok(into_series(request, Self::parse_values(resp)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::providers::fixtures::{hourly_request, ts};

    #[test]
    fn url_requests_utc_hourly_bars() {
        let url = TwelveDataProvider::bars_url(&hourly_request(), "k").unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("interval=1h"));
        assert!(query.contains("timezone=UTC"));
        assert!(query.contains("apikey=k"));
    }

    #[test]
    fn parses_string_values() {
        let json = r#"{
            "meta": {"symbol": "AAPL", "interval": "1h"},
            "values": [
                {"datetime": "2024-01-02 15:00:00", "open": "185.0", "high": "186.0", "low": "184.9", "close": "185.5", "volume": "1200"},
                {"datetime": "2024-01-02 16:00:00", "open": "185.5", "high": "185.9", "low": "185.0", "close": "185.2"}
            ],
            "status": "ok"
        }"#;
        let bars = TwelveDataProvider::parse_values(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(bars[0].timestamp, ts(2024, 1, 2, 15));
        assert_eq!(bars[0].close, 185.5);
        assert_eq!(bars[0].volume, 1200.0);
        // absent volume becomes zero
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn error_status_is_reported() {
        let json =
            r#"{"code": 401, "message": "**apikey** parameter is incorrect", "status": "error"}"#;
        assert!(matches!(
            TwelveDataProvider::parse_values(serde_json::from_str(json).unwrap()),
            Err(ProviderError::Api(_))
        ));
    }
}
