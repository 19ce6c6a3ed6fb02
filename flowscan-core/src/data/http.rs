//! Blocking HTTP transport shared by the provider adapters.

use super::provider::ProviderError;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Longest response-body excerpt carried inside an error.
const BODY_EXCERPT: usize = 200;

/// Thin wrapper around a blocking `reqwest` client.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("flowscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and decode the JSON body into `T`.
    ///
    /// Non-2xx statuses become [`ProviderError::Status`]; undecodable bodies become
    /// [`ProviderError::Malformed`]. The URL is never logged since it may carry an API key.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        headers: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        debug!(host = url.host_str().unwrap_or_default(), path = url.path(), "GET");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let resp = request.send()?;
        let status = resp.status();
        let body = resp.text()?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::Malformed(format!("{e} (body starts: {})", excerpt(&body)))
        })
    }
}

/// Build a URL with query parameters, mapping parse failures onto the provider taxonomy.
pub fn url_with_params(base: &str, params: &[(&str, String)]) -> Result<Url, ProviderError> {
    Url::parse_with_params(base, params)
        .map_err(|e| ProviderError::InvalidRequest(format!("{base}: {e}")))
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_params_encodes_query() {
        let url = url_with_params(
            "https://example.com/v1/bars",
            &[("symbol", "BRK B".to_string()), ("from", "2024-01-02".to_string())],
        )
        .unwrap();
        assert_eq!(url.path(), "/v1/bars");
        assert_eq!(url.query(), Some("symbol=BRK+B&from=2024-01-02"));
    }

    #[test]
    fn url_with_params_rejects_garbage_base() {
        let err = url_with_params("not a url", &[]).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn network_errors_do_not_leak_the_key() {
        let http = HttpClient::new(Duration::from_secs(2)).unwrap();
        let url = url_with_params(
            "http://127.0.0.1:9/v1/eod",
            &[("access_key", "SUPERSECRETKEY".to_string())],
        )
        .unwrap();

        let err = http.get_json::<serde_json::Value>(url, &[]).unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)), "got {err:?}");
        assert!(!err.to_string().contains("SUPERSECRETKEY"), "{err}");
        assert!(!format!("{err:?}").contains("SUPERSECRETKEY"));
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(1000);
        assert_eq!(excerpt(&body).len(), BODY_EXCERPT);
        assert_eq!(excerpt("short"), "short");
    }
}
