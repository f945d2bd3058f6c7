use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a
/// plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("TRADEINTEL_ENV", "development"));

    let bind_addr = or_default("TRADEINTEL_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TRADEINTEL_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TRADEINTEL_LOG_LEVEL", "info");

    let fetch_timeout_secs = parse_u64("TRADEINTEL_FETCH_TIMEOUT_SECS", "25")?;
    let fetch_user_agent = or_default("TRADEINTEL_FETCH_USER_AGENT", DEFAULT_USER_AGENT);
    let fetch_max_attempts = parse_u32("TRADEINTEL_FETCH_MAX_ATTEMPTS", "3")?;
    if fetch_max_attempts == 0 {
        return Err(invalid(
            "TRADEINTEL_FETCH_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let fetch_backoff_base_ms = parse_u64("TRADEINTEL_FETCH_BACKOFF_BASE_MS", "1000")?;
    let rate_limit_cooldown_secs = parse_u64("TRADEINTEL_RATE_LIMIT_COOLDOWN_SECS", "60")?;
    let max_rate_limit_cooldowns = parse_u32("TRADEINTEL_MAX_RATE_LIMIT_COOLDOWNS", "3")?;

    let proxy_endpoint = or_default("TRADEINTEL_PROXY_ENDPOINT", "http://api.scraperapi.com/");
    if !(proxy_endpoint.starts_with("http://") || proxy_endpoint.starts_with("https://")) {
        return Err(invalid(
            "TRADEINTEL_PROXY_ENDPOINT",
            format!("\"{proxy_endpoint}\" is not an http(s) URL"),
        ));
    }

    let search_budget_secs = parse_u64("TRADEINTEL_SEARCH_BUDGET_SECS", "120")?;
    let default_max_results = parse_usize("TRADEINTEL_DEFAULT_MAX_RESULTS", "10")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        fetch_timeout_secs,
        fetch_user_agent,
        fetch_max_attempts,
        fetch_backoff_base_ms,
        rate_limit_cooldown_secs,
        max_rate_limit_cooldowns,
        proxy_endpoint,
        search_budget_secs,
        default_max_results,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
