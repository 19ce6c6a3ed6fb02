//! Finnhub stock candles.
//!
//! The payload is columnar: parallel arrays keyed by field letter, plus a status flag.

use super::{bar, end_epoch, into_series, start_epoch};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{from_epoch_seconds, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const BASE_URL: &str = "https://finnhub.io/api/v1/stock/candle";

#[derive(Debug, Deserialize)]
pub(crate) struct CandleResponse {
    s: Option<String>,
    t: Option<Vec<i64>>,
    o: Option<Vec<Option<Numeric>>>,
    h: Option<Vec<Option<Numeric>>>,
    l: Option<Vec<Option<Numeric>>>,
    c: Option<Vec<Option<Numeric>>>,
    v: Option<Vec<Option<Numeric>>>,
    error: Option<String>,
}

pub struct FinnhubProvider {
    http: HttpClient,
    api_key: SecretString,
}

impl FinnhubProvider {
    pub fn new(http: HttpClient, api_key: &str) -> Self {
        Self {
            http,
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub(crate) fn bars_url(request: &FetchRequest, api_key: &str) -> Result<Url, ProviderError> {
        let resolution = match request.resolution {
            Resolution::Daily => "D",
            Resolution::Hourly => "60",
        };
        url_with_params(
            BASE_URL,
            &[
                ("symbol", request.symbol.clone()),
                ("resolution", resolution.to_string()),
                ("from", start_epoch(request).to_string()),
                ("to", end_epoch(request).to_string()),
                ("token", api_key.to_string()),
            ],
        )
    }

    pub(crate) fn parse_candles(resp: CandleResponse) -> Result<Vec<Bar>, ProviderError> {
        if let Some(error) = resp.error {
            return Err(ProviderError::Api(error));
        }
        match resp.s.as_deref() {
            Some("no_data") => return Ok(Vec::new()),
            Some("ok") => {}
            Some(other) => return Err(ProviderError::Api(format!("status '{other}'"))),
            None => return Err(ProviderError::MissingField("s".into())),
        }

        let stamps = resp.t.ok_or_else(|| ProviderError::MissingField("t".into()))?;
        let column = |values: Option<Vec<Option<Numeric>>>,
                      name: &str|
         -> Result<Vec<Option<Numeric>>, ProviderError> {
            let values = values.ok_or_else(|| ProviderError::MissingField(name.into()))?;
            if values.len() != stamps.len() {
                return Err(ProviderError::Malformed(format!(
                    "column '{name}' has {} values for {} timestamps",
                    values.len(),
                    stamps.len()
                )));
            }
            Ok(values)
        };
        let open = column(resp.o, "o")?;
        let high = column(resp.h, "h")?;
        let low = column(resp.l, "l")?;
        let close = column(resp.c, "c")?;
        // Volume is optional for some instruments.
        let volume = resp.v.unwrap_or_else(|| vec![None; stamps.len()]);

        stamps
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let ts = from_epoch_seconds(t)
                    .ok_or_else(|| ProviderError::Malformed(format!("invalid timestamp: {t}")))?;
                let vol = volume.get(i).cloned().flatten();
                Ok(bar(ts, &open[i], &high[i], &low[i], &close[i], &vol))
            })
            .collect()
    }
}

impl DataProvider for FinnhubProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let url = Self::bars_url(request, self.api_key.expose_secret())?;
        let resp: CandleResponse = self.http.get_json(url, &[])?;
        Ok(into_series(request, Self::parse_candles(resp)?))
    }
}
