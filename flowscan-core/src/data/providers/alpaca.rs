//! Alpaca market-data v2 bars endpoint.
//!
//! Authenticates through a key-id/secret header pair. Responses page through
//! `next_page_token`, so a long range can take more than one request.

use super::{bar, into_series};
use crate::data::http::{url_with_params, HttpClient};
use crate::data::normalize::{parse_timestamp, Numeric};
use crate::data::provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
use crate::domain::{Bar, BarSeries, Resolution};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;

const BASE_URL: &str = "https://data.alpaca.markets/v2/stocks";

/// Guard against a vendor that keeps handing out page tokens.
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
pub(crate) struct BarsPage {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: String,
    o: Option<Numeric>,
    h: Option<Numeric>,
    l: Option<Numeric>,
    c: Option<Numeric>,
    v: Option<Numeric>,
}

pub struct AlpacaProvider {
    http: HttpClient,
    key_id: SecretString,
    secret: SecretString,
}

impl AlpacaProvider {
    pub fn new(http: HttpClient, key_id: &str, secret: &str) -> Self {
        Self {
            http,
            key_id: SecretString::new(key_id.into()),
            secret: SecretString::new(secret.into()),
        }
    }

    fn timeframe(resolution: Resolution) -> &'static str {
        match resolution {
            Resolution::Daily => "1Day",
            Resolution::Hourly => "1Hour",
        }
    }

    /// Bars URL for one page of the request.
    pub(crate) fn bars_url(
        request: &FetchRequest,
        page_token: Option<&str>,
    ) -> Result<Url, ProviderError> {
        let mut params = vec![
            ("start", format!("{}T00:00:00Z", request.start)),
            ("end", format!("{}T23:59:59Z", request.end)),
            ("timeframe", Self::timeframe(request.resolution).to_string()),
            ("limit", "10000".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("page_token", token.to_string()));
        }
        url_with_params(&format!("{BASE_URL}/{}/bars", request.symbol), &params)
    }

    /// Decode one page. Returns the bars and the token for the next page, if any.
    pub(crate) fn parse_page(
        page: BarsPage,
    ) -> Result<(Vec<Bar>, Option<String>), ProviderError> {
        if page.bars.is_none() {
            if let Some(message) = page.message {
                return Err(ProviderError::Api(message));
            }
        }

        let rows = page.bars.unwrap_or_default();
        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            let ts = parse_timestamp(&row.t).ok_or_else(|| {
                ProviderError::Malformed(format!("invalid timestamp: {}", row.t))
            })?;
            bars.push(bar(ts, &row.o, &row.h, &row.l, &row.c, &row.v));
        }

        let next = page.next_page_token.filter(|t| !t.is_empty());
        Ok((bars, next))
    }

    /// Follow page tokens until the vendor stops handing them out.
    ///
    /// A token still pending after [`MAX_PAGES`] pages is an error rather than a
    /// silently truncated series.
    pub(crate) fn collect_pages<F>(mut next_page: F) -> Result<Vec<Bar>, ProviderError>
    where
        F: FnMut(Option<&str>) -> Result<BarsPage, ProviderError>,
    {
        let mut all = Vec::new();
        let mut token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let (bars, next) = Self::parse_page(next_page(token.as_deref())?)?;
            all.extend(bars);
            match next {
                Some(t) => token = Some(t),
                None => return Ok(all),
            }
        }

        warn!(pages = MAX_PAGES, rows = all.len(), "alpaca pagination did not terminate");
        Err(ProviderError::Malformed(format!("pagination still open after {MAX_PAGES} pages")))
    }
}

impl DataProvider for AlpacaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Alpaca
    }

    fn supports(&self, _resolution: Resolution) -> bool {
        true
    }

    fn fetch(&self, request: &FetchRequest) -> Result<BarSeries, ProviderError> {
        let headers = [
            ("APCA-API-KEY-ID", self.key_id.expose_secret()),
            ("APCA-API-SECRET-KEY", self.secret.expose_secret()),
        ];

        let bars = Self::collect_pages(|token| {
            let url = Self::bars_url(request, token)?;
            self.http.get_json(url, &headers)
        })?;
        Ok(into_series(request, bars))
    }
}
