//! Data acquisition: provider adapters, fallback fetching and session filtering.

pub mod credentials;
pub mod fallback;
pub mod http;
pub mod normalize;
pub mod provider;
pub mod providers;
pub mod session;

pub use credentials::{Credential, Credentials};
pub use fallback::{
    AttemptOutcome, FallbackFetcher, FetchError, FetchOutcome, ProviderAttempt, SkipReason,
    DEFAULT_DAILY_ORDER, DEFAULT_HOURLY_ORDER,
};
pub use http::HttpClient;
pub use provider::{DataProvider, FetchRequest, ProviderError, ProviderId};
pub use session::SessionHours;
