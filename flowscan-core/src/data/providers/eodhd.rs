//! EOD Historical Data. US listings are addressed as `{symbol}.US`.

use super::{bar, end_epoch, into_series, start_epoch};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{from_epoch_seconds, parse_timestamp, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const BASE_URL: &str = "https://eodhd.com/api";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EodhdResponse {
    Rows(Vec<EodhdRow>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub(crate) struct EodhdRow {
    /// Daily rows carry a date string.
    date: Option<String>,
    /// Intraday rows carry epoch seconds.
    timestamp: Option<i64>,
    open: Option<Numeric>,
    high: Option<Numeric>,
    low: Option<Numeric>,
    close: Option<Numeric>,
    volume: Option<Numeric>,
}

pub struct EodhdProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl EodhdProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let ticker = format!("{}.US", request.symbol);
        match request.resolution {
            Resolution::Daily => url_with_params(
                &format!("{BASE_URL}/eod/{ticker}"),
                &[
                    ("from", request.start.to_string()),
                    ("to", request.end.to_string()),
                    ("period", "d".to_string()),
                    ("fmt", "json".to_string()),
                    ("api_token", api_key.to_string()),
                ],
            ),
            Resolution::Hourly => url_with_params(
                &format!("{BASE_URL}/intraday/{ticker}"),
                &[
                    ("interval", "1h".to_string()),
                    ("from", start_epoch(request).to_string()),
                    ("to", end_epoch(request).to_string()),
                    ("fmt", "json".to_string()),
                    ("api_token", api_key.to_string()),
                ],
            ),
        }
    }

    pub(crate) fn parse_rows(resp: EodhdResponse) -> Result<Vec<Bar>, ProviderError> {
        let rows = match resp {
            EodhdResponse::Rows(rows) => rows,
            EodhdResponse::Other(value) => {
                let mut reason = value.to_string();
                reason.truncate(200);
                return Err(ProviderError::Api(reason));
            }
        };

        rows.iter()
            .map(|row| {
                let ts = match (row.timestamp, row.date.as_deref()) {
                    (Some(t), _) => from_epoch_seconds(t),
                    (None, Some(date)) => parse_timestamp(date),
                    (None, None) => return Err(ProviderError::MissingField("date".into())),
                }
                .ok_or_else(|| ProviderError::Malformed(format!("invalid row time: {row:?}")))?;
                Ok(bar(ts, &row.open, &row.high, &row.low, &row.close, &row.volume))
            })
            .collect()
    }
}

impl DataProvider for EodhdProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Eodhd
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let resp: EodhdResponse = self.http.get_json(url, &[])?;
        Ok(into_series(request, Self::parse_rows(resp)?))
    }
}
