use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings read once at startup and shared read-only afterwards.
///
/// Credentials (proxy keys, source API keys) are deliberately absent: they
/// are looked up per request through the search crate's credential store.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Timeout applied to each individual HTTP attempt.
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    /// Counted attempts per fetch (429 cooldowns are not counted).
    pub fetch_max_attempts: u32,
    /// Wait before attempt `n + 1` is `fetch_backoff_base_ms * 2^(n-1)`.
    pub fetch_backoff_base_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    pub max_rate_limit_cooldowns: u32,
    pub proxy_endpoint: String,
    /// Wall-clock budget for one fan-out across all selected sources.
    pub search_budget_secs: u64,
    pub default_max_results: usize,
}
