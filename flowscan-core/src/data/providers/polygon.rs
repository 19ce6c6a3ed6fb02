//! Polygon.io aggregates.

use super::{bar, into_series};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{from_epoch_millis, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const BASE_URL: &str = "https://api.polygon.io/v2/aggs/ticker";

#[derive(Debug, Deserialize)]
pub(crate) struct AggsResponse {
    status: Option<String>,
    results: Option<Vec<Agg>>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Agg {
    /// Epoch milliseconds.
    t: i64,
    o: Option<Numeric>,
    h: Option<Numeric>,
    l: Option<Numeric>,
    c: Option<Numeric>,
    v: Option<Numeric>,
}

pub struct PolygonProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl PolygonProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let span = match request.resolution {
            Resolution::Daily => "day",
            Resolution::Hourly => "hour",
        };
        let base = format!(
            "{BASE_URL}/{}/range/1/{span}/{}/{}",
            request.symbol, request.start, request.end
        );
        url_with_params(
            &base,
            &[
                ("adjusted", "true".to_string()),
                ("sort", "asc".to_string()),
                ("limit", "50000".to_string()),
                ("apiKey", api_key.to_string()),
            ],
        )
    }

    pub(crate) fn parse_aggs(resp: AggsResponse) -> Result<Vec<Bar>, ProviderError> {
        if matches!(resp.status.as_deref(), Some("ERROR" | "NOT_AUTHORIZED")) {
            let reason = resp
                .error
                .or(resp.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ProviderError::Api(reason));
        }

        resp.results
            .unwrap_or_default()
            .iter()
            .map(|agg| {
                let ts = from_epoch_millis(agg.t)
                    .ok_or_else(|| {
                        ProviderError::Malformed(format!("invalid timestamp: {}", agg.t))
                    })?;
                Ok(bar(ts, &agg.o, &agg.h, &agg.l, &agg.c, &agg.v))
            })
            .collect()
    }
}

impl DataProvider for PolygonProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Polygon
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let resp: AggsResponse = self.http.get_json(url, &[])?;
        Ok(into_series(request, Self::parse_aggs(resp)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::providers::fixtures::{daily_request, hourly_request, ts};

    #[test]
    fn url_embeds_range_in_path() {
        let url = PolygonProvider::bars_url(&daily_request(), "k").unwrap();
        assert_eq!(url.path(), "/v2/aggs/ticker/AAPL/range/1/day/2024-01-02/2024-01-05");
        assert!(url.query().unwrap().contains("apiKey=k"));

        let hourly = PolygonProvider::bars_url(&hourly_request(), "k").unwrap();
        assert!(hourly.path().contains("/range/1/hour/"));
    }

    #[test]
    fn parses_millisecond_timestamps() {
        let json = r#"{
            "ticker": "AAPL", "status": "OK", "resultsCount": 2,
            "results": [
                {"v": 1200, "vw": 185.1, "o": 185.0, "c": 185.5, "h": 186.0, "l": 184.9, "t": 1704207600000, "n": 10},
                {"v": 900, "vw": 185.6, "o": 185.5, "c": 185.2, "h": 185.9, "l": 185.0, "t": 1704211200000, "n": 8}
            ]
        }"#;
        let bars = PolygonProvider::parse_aggs(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, ts(2024, 1, 2, 15));
        assert_eq!(bars[1].timestamp, ts(2024, 1, 2, 16));
        assert_eq!(bars[0].volume, 1200.0);
    }

    #[test]
    fn missing_results_is_empty() {
        let json = r#"{"ticker": "AAPL", "status": "OK", "resultsCount": 0}"#;
        assert!(PolygonProvider::parse_aggs(serde_json::from_str(json).unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn error_status_is_reported() {
        let json = r#"{"status": "ERROR", "error": "Unknown API Key"}"#;
        let err = PolygonProvider::parse_aggs(serde_json::from_str(json).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::Api(m) if m == "Unknown API Key"));
    }
}
