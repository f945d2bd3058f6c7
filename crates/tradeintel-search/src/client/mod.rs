//! Retrying HTTP fetcher shared by every source adapter.

mod proxy;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tradeintel_core::AppConfig;

use crate::error::FetchError;
use crate::rate_limit::{retry_with_backoff, RetryPolicy};

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const DEFAULT_PROXY_ENDPOINT: &str = "http://api.scraperapi.com/";

/// Expected response body type; only affects the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accept {
    #[default]
    Html,
    Json,
}

impl Accept {
    fn header_value(self) -> &'static str {
        match self {
            Accept::Html => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            Accept::Json => "application/json,*/*;q=0.5",
        }
    }
}

/// One logical GET.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    url: &'a str,
    credential: Option<&'a str>,
    render_javascript: bool,
    region: Option<&'a str>,
    accept: Accept,
    api_key_header: Option<(&'static str, &'a str)>,
}

impl<'a> FetchRequest<'a> {
    #[must_use]
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            credential: None,
            render_javascript: false,
            region: None,
            accept: Accept::Html,
            api_key_header: None,
        }
    }

    /// Routes the request through the scraping proxy with this API key.
    #[must_use]
    pub fn via_proxy(mut self, credential: Option<&'a str>) -> Self {
        self.credential = credential.filter(|c| !c.is_empty());
        self
    }

    /// Asks the proxy to execute javascript before returning the page.
    /// Ignored for direct requests.
    #[must_use]
    pub fn render_javascript(mut self, render: bool) -> Self {
        self.render_javascript = render;
        self
    }

    /// Pins the proxy exit to a region (two-letter code). Blank means none.
    #[must_use]
    pub fn region(mut self, region: &'a str) -> Self {
        self.region = Some(region).filter(|r| !r.is_empty());
        self
    }

    #[must_use]
    pub fn accept(mut self, accept: Accept) -> Self {
        self.accept = accept;
        self
    }

    /// Sends an API key in the named header. The key never appears in the
    /// requested URL, so errors and logs cannot carry it.
    #[must_use]
    pub fn api_key_header(mut self, name: &'static str, key: Option<&'a str>) -> Self {
        self.api_key_header = key.filter(|k| !k.is_empty()).map(|k| (name, k));
        self
    }

    #[must_use]
    pub fn url(&self) -> &'a str {
        self.url
    }
}

/// Settings the fetcher is built from; immutable once the fetcher exists.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub proxy_endpoint: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(25),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
            proxy_endpoint: DEFAULT_PROXY_ENDPOINT.to_owned(),
        }
    }
}

impl FetcherConfig {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            user_agent: config.fetch_user_agent.clone(),
            retry: RetryPolicy::from_config(config),
            proxy_endpoint: config.proxy_endpoint.clone(),
        }
    }
}

/// HTTP GET with bounded retries, exponential backoff and 429 cooldown.
///
/// - 2xx returns the body.
/// - 429 sleeps the cooldown and retries without spending an attempt.
/// - Other 4xx fail at once.
/// - 5xx, unfollowed 3xx and network errors back off and retry.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    proxy_endpoint: String,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            retry: config.retry,
            proxy_endpoint: config.proxy_endpoint.clone(),
        })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// URL actually requested for `request`: the target itself, or the proxy
    /// URL wrapping it when a credential is set.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the target is not an absolute
    /// `http(s)` URL or the proxy endpoint cannot be parsed.
    pub fn request_url(&self, request: &FetchRequest<'_>) -> Result<String, FetchError> {
        proxy::check_target(request.url)?;
        match request.credential {
            Some(key) => proxy::proxied_url(
                &self.proxy_endpoint,
                request.url,
                key,
                request.render_javascript,
                request.region,
            ),
            None => Ok(request.url.to_owned()),
        }
    }

    /// Fetches the body for `request`.
    ///
    /// Errors and logs always name the target URL, never the proxy URL,
    /// so the proxy key does not leak.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Rejected`]: 4xx other than 429 (not retried).
    /// - [`FetchError::ServerError`]: 5xx after all attempts.
    /// - [`FetchError::UnexpectedStatus`]: another non-2xx status after all attempts.
    /// - [`FetchError::RateLimited`]: 429 persisted past the cooldown budget.
    /// - [`FetchError::Http`]: network or timeout failure after all attempts.
    /// - [`FetchError::InvalidUrl`]: the target URL is unusable (not retried).
    pub async fn fetch(&self, request: &FetchRequest<'_>) -> Result<String, FetchError> {
        let request_url = self.request_url(request)?;
        let target = request.url;
        let host = proxy::host_of(target);
        let proxied = request.credential.is_some();
        let accept = request.accept.header_value();
        let api_key = request.api_key_header;

        retry_with_backoff(self.retry, |attempt| {
            let request_url = request_url.clone();
            let host = host.clone();
            async move {
                match self.send_once(&request_url, target, accept, api_key).await {
                    Ok((status, body)) => {
                        tracing::info!(
                            url = target,
                            host = %host,
                            attempt,
                            proxied,
                            status,
                            bytes = body.len(),
                            "fetch succeeded"
                        );
                        Ok(body)
                    }
                    Err(err) => {
                        tracing::warn!(
                            url = target,
                            host = %host,
                            attempt,
                            proxied,
                            classification = err.classification(),
                            error = %err,
                            "fetch attempt failed"
                        );
                        Err(err)
                    }
                }
            }
        })
        .await
    }

    async fn send_once(
        &self,
        request_url: &str,
        target: &str,
        accept: &str,
        api_key: Option<(&'static str, &str)>,
    ) -> Result<(u16, String), FetchError> {
        let mut builder = self
            .client
            .get(request_url)
            .header(reqwest::header::ACCEPT, accept)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9");
        if let Some((name, key)) = api_key {
            builder = builder.header(name, key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Http(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, target));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.without_url()))?;
        Ok((status.as_u16(), body))
    }
}

fn classify_status(status: StatusCode, url: &str) -> FetchError {
    let url = url.to_owned();
    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::RateLimited { url, cooldowns: 0 }
    } else if status.is_server_error() {
        FetchError::ServerError { status: code, url }
    } else if status.is_client_error() {
        FetchError::Rejected { status: code, url }
    } else {
        FetchError::UnexpectedStatus { status: code, url }
    }
}
