//! Scraping-proxy URL rewriting.

use url::Url;

use crate::error::FetchError;
use crate::urls::is_valid_url;

/// Rewrites `target` to go through the scraping proxy at `endpoint`:
/// `<endpoint>?api_key=K&url=<target>[&render=true][&country_code=R]`.
pub(super) fn proxied_url(
    endpoint: &str,
    target: &str,
    api_key: &str,
    render_javascript: bool,
    region: Option<&str>,
) -> Result<String, FetchError> {
    let mut url = Url::parse(endpoint).map_err(|e| FetchError::InvalidUrl {
        url: endpoint.to_owned(),
        reason: format!("proxy endpoint: {e}"),
    })?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("api_key", api_key);
        query.append_pair("url", target);
        if render_javascript {
            query.append_pair("render", "true");
        }
        if let Some(region) = region.filter(|r| !r.is_empty()) {
            query.append_pair("country_code", region);
        }
    }
    Ok(url.into())
}

/// Rejects targets that are not absolute `http(s)` URLs before any I/O.
pub(super) fn check_target(target: &str) -> Result<(), FetchError> {
    if is_valid_url(target) {
        Ok(())
    } else {
        Err(FetchError::InvalidUrl {
            url: target.to_owned(),
            reason: "expected an absolute http(s) URL".to_owned(),
        })
    }
}

/// Host portion of a URL for log fields; falls back to the input.
pub(super) fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
