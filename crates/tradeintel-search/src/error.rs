use thiserror::Error;

/// What the fetcher should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient failure: sleep on the exponential schedule and spend an attempt.
    Backoff,
    /// HTTP 429: sleep the fixed cooldown; the attempt budget is untouched.
    Cooldown,
    /// Retrying cannot help.
    GiveUp,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error {status} from {url}")]
    ServerError { status: u16, url: String },

    #[error("request rejected with {status} by {url}")]
    Rejected { status: u16, url: String },

    /// Non-success status outside 4xx and 5xx, e.g. a redirect that was not followed.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("rate limited by {url} after {cooldowns} cooldowns")]
    RateLimited { url: String, cooldowns: u32 },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            FetchError::Http(e) => {
                if e.is_builder() {
                    Disposition::GiveUp
                } else {
                    Disposition::Backoff
                }
            }
            FetchError::ServerError { .. } | FetchError::UnexpectedStatus { .. } => {
                Disposition::Backoff
            }
            FetchError::RateLimited { .. } => Disposition::Cooldown,
            FetchError::Rejected { .. } | FetchError::InvalidUrl { .. } => Disposition::GiveUp,
        }
    }

    /// Short, stable label used in logs and degraded-mode notes.
    #[must_use]
    pub fn classification(&self) -> &'static str {
        match self {
            FetchError::Http(e) if e.is_timeout() => "timeout",
            FetchError::Http(e) if e.is_connect() => "connect",
            FetchError::Http(_) => "network",
            FetchError::ServerError { .. } => "server_error",
            FetchError::Rejected { .. } => "rejected",
            FetchError::UnexpectedStatus { .. } => "unexpected_status",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::InvalidUrl { .. } => "invalid_url",
        }
    }
}

/// Failure of a whole adapter invocation. The orchestrator turns it into a
/// per-source error outcome; it never aborts sibling sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not build request URL from \"{base}\": {reason}")]
    Url { base: String, reason: String },

    #[error("{source_name} timed out: {message}")]
    Timeout {
        source_name: String,
        message: String,
    },

    #[error("{0}")]
    Internal(String),
}

/// A single record that could not be mapped; skipped without aborting the adapter.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unusable link \"{0}\"")]
    BadLink(String),

    #[error("filtered: {0}")]
    Filtered(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Conditions that fail an entire aggregate search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("maxPerSource must be at least 1")]
    InvalidLimit,
}
