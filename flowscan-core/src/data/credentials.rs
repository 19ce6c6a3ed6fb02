//! Provider credential set.
//!
//! Resolved once at process start and read-only afterwards. There are no baked-in
//! fallback keys: a provider without a credential is skipped by the fetcher.

use super::provider::ProviderId;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// API key (plus optional secret) for one provider.
pub struct Credential {
    key: SecretString,
    secret: Option<SecretString>,
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: SecretString::new(key.into().into()),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::new(secret.into().into()));
        self
    }

    pub fn key(&self) -> &str {
        self.key.expose_secret()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_ref().map(|s| s.expose_secret())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("key", &"[REDACTED]")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Mapping provider → credential.
#[derive(Debug, Default)]
pub struct Credentials {
    entries: HashMap<ProviderId, Credential>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every provider's variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    ///
    /// Blank values count as unset. A vendor that needs a secret is only configured
    /// when both halves are present.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut creds = Self::new();
        for id in ProviderId::ALL {
            let Some(key) = read(id.key_var()) else {
                continue;
            };
            let credential = match id.secret_var() {
                Some(secret_var) => match read(secret_var) {
                    Some(secret) => Credential::new(key).with_secret(secret),
                    None => continue,
                },
                None => Credential::new(key),
            };
            creds.insert(id, credential);
        }
        creds
    }

    pub fn insert(&mut self, id: ProviderId, credential: Credential) {
        self.entries.insert(id, credential);
    }

    pub fn with(mut self, id: ProviderId, credential: Credential) -> Self {
        self.insert(id, credential);
        self
    }

    pub fn get(&self, id: ProviderId) -> Option<&Credential> {
        self.entries.get(&id)
    }

    pub fn has(&self, id: ProviderId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Configured providers, in canonical order.
    pub fn configured(&self) -> Vec<ProviderId> {
        ProviderId::ALL.into_iter().filter(|id| self.has(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn unset_and_blank_variables_are_skipped() {
        let creds = Credentials::from_lookup(lookup_from(&[
            ("FINNHUB_KEY", "abc"),
            ("POLYGON_KEY", "   "),
        ]));
        assert_eq!(creds.configured(), vec![ProviderId::Finnhub]);
        assert_eq!(creds.get(ProviderId::Finnhub).unwrap().key(), "abc");
    }

    #[test]
    fn alpaca_needs_both_halves() {
        let half = Credentials::from_lookup(lookup_from(&[("ALPACA_KEY", "id")]));
        assert!(!half.has(ProviderId::Alpaca));

        let full = Credentials::from_lookup(lookup_from(&[
            ("ALPACA_KEY", "id"),
            ("ALPACA_SECRET", "shh"),
        ]));
        let cred = full.get(ProviderId::Alpaca).unwrap();
        assert_eq!(cred.key(), "id");
        assert_eq!(cred.secret(), Some("shh"));
    }

    #[test]
    fn debug_output_is_redacted() {
        let cred = Credential::new("super-secret-key").with_secret("hidden");
        let shown = format!("{cred:?}");
        assert!(!shown.contains("super-secret-key"));
        assert!(!shown.contains("hidden"));
    }
}
