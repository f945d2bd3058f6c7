//! Read-only credential lookup used by adapters at request time.

use std::collections::HashMap;

/// Scraping-proxy API key.
pub const PROXY_KEY: &str = "SCRAPERAPI_KEY";
/// Optional UN Comtrade subscription key.
pub const COMTRADE_KEY: &str = "COMTRADE_API_KEY";

/// Named-secret lookup. Empty values are reported as absent.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from the process environment on every lookup, so a
/// key exported after startup is picked up by the next request.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialStore for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory credentials.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
