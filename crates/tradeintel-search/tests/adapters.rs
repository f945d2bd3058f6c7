//! End-to-end adapter tests: real `Fetcher`, `wiremock` standing in for the
//! scraping proxy and the UN Comtrade API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradeintel_search::credentials::{COMTRADE_KEY, PROXY_KEY};
use tradeintel_search::sources::UnComtrade;
use tradeintel_search::{
    Fetcher, FetcherConfig, RetryPolicy, SearchParams, SourceAdapter, SourceContext,
    SourceRegistry, StaticCredentials,
};

const GOOGLE_PAGE: &str = r#"
<html><body>
  <div class="g">
    <a href="/url?q=https://www.schaeffler.com/en/&amp;sa=U"><h3>Schaeffler AG</h3></a>
    <div class="VwiC3b">Rolling and plain bearings importer. sales@schaeffler.com</div>
  </div>
  <div class="g">
    <a href="https://www.skf.com/de"><h3>SKF GmbH</h3></a>
    <div class="VwiC3b">Ball bearing distribution in Germany.</div>
  </div>
</body></html>
"#;

fn context(proxy_endpoint: &str, credentials: StaticCredentials) -> SourceContext {
    let fetcher = Fetcher::new(&FetcherConfig {
        timeout: Duration::from_secs(5),
        user_agent: "tradeintel-test/0.1".to_string(),
        retry: RetryPolicy {
            max_attempts: 2,
            backoff_base: Duration::from_millis(1),
            cooldown: Duration::from_millis(1),
            max_cooldowns: 1,
        },
        proxy_endpoint: proxy_endpoint.to_string(),
    })
    .expect("failed to build test Fetcher");
    SourceContext::new(Arc::new(fetcher), Arc::new(credentials))
}

fn adapter(id: &str) -> Arc<dyn SourceAdapter> {
    SourceRegistry::builtin()
        .resolve(id)
        .unwrap_or_else(|| panic!("adapter {id} not registered"))
}

fn bearing_query() -> SearchParams {
    SearchParams::new("ball bearing").with_target_country("Germany")
}

// ---------------------------------------------------------------------------
// Degraded mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_proxy_key_yields_single_fallback_without_requests() {
    let server = MockServer::start().await;
    let ctx = context(&format!("{}/proxy", server.uri()), StaticCredentials::new());

    let results = adapter("panjiva")
        .search(&ctx, &SearchParams::new("ball bearing"), 10)
        .await
        .expect("adapter never fails on a missing credential");

    assert_eq!(results.len(), 1);
    let fallback = &results[0];
    assert!(fallback.is_fallback());
    assert_eq!(fallback.raw_data["reason"], "missing_credential");
    assert!(fallback.raw_data["note"]
        .as_str()
        .is_some_and(|note| note.contains(PROXY_KEY)));
    assert_eq!(fallback.website, "https://panjiva.com/search?q=ball+bearing");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn proxy_rejection_yields_fetch_failed_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let ctx = context(
        &format!("{}/proxy", server.uri()),
        StaticCredentials::new().with(PROXY_KEY, "proxy-key"),
    );

    let results = adapter("google")
        .search(&ctx, &bearing_query(), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_data["reason"], "fetch_failed");
    assert!(results[0].website.starts_with("https://www.google.com/search?q="));
    assert_eq!(results[0].country, "Germany");
}

#[tokio::test]
async fn page_without_cards_yields_no_records_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><p>captcha</p></html>"))
        .mount(&server)
        .await;
    let ctx = context(
        &format!("{}/proxy", server.uri()),
        StaticCredentials::new().with(PROXY_KEY, "proxy-key"),
    );

    let results = adapter("trademo")
        .search(&ctx, &bearing_query(), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_data["reason"], "no_records");
}

// ---------------------------------------------------------------------------
// Live results through the proxy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn google_results_are_parsed_from_proxied_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(query_param("api_key", "proxy-key"))
        .and(query_param("render", "true"))
        .and(query_param("country_code", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GOOGLE_PAGE))
        .mount(&server)
        .await;
    let ctx = context(
        &format!("{}/proxy", server.uri()),
        StaticCredentials::new().with(PROXY_KEY, "proxy-key"),
    );

    let results = adapter("google")
        .search(&ctx, &bearing_query(), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.is_fallback()));
    assert_eq!(results[0].company_name, "Schaeffler AG");
    assert_eq!(results[0].website, "https://www.schaeffler.com/en/");
    assert_eq!(results[0].contact, "sales@schaeffler.com");
    assert_eq!(results[1].website, "https://www.skf.com/de");
}

#[tokio::test]
async fn live_results_respect_max_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GOOGLE_PAGE))
        .mount(&server)
        .await;
    let ctx = context(
        &format!("{}/proxy", server.uri()),
        StaticCredentials::new().with(PROXY_KEY, "proxy-key"),
    );

    let results = adapter("google")
        .search(&ctx, &bearing_query(), 1)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].company_name, "Schaeffler AG");
}

// ---------------------------------------------------------------------------
// UN Comtrade
// ---------------------------------------------------------------------------

fn comtrade(server: &MockServer) -> UnComtrade {
    UnComtrade::new(&format!("{}/data/v1/get/C/A/HS", server.uri()), 2023)
}

#[tokio::test]
async fn comtrade_sends_subscription_key_but_never_exposes_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/v1/get/C/A/HS"))
        .and(query_param("cmdCode", "848210"))
        .and(query_param("partnerCode", "DE"))
        .and(header("Ocp-Apim-Subscription-Key", "comtrade-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"reporterDesc": "Germany", "partnerDesc": "Türkiye", "primaryValue": 1_250_000},
                {"reporterDesc": "Italy", "partnerDesc": "Türkiye", "primaryValue": 640_000}
            ]
        })))
        .mount(&server)
        .await;
    let ctx = context(
        "http://proxy.invalid/",
        StaticCredentials::new().with(COMTRADE_KEY, "comtrade-key"),
    );

    let params = bearing_query().with_hs_code("8482.10");
    let results = comtrade(&server).search(&ctx, &params, 10).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].company_name, "Germany → Türkiye");
    assert_eq!(results[0].raw_data["tradeValueUsd"], 1_250_000);
    assert!(results
        .iter()
        .all(|r| !r.website.contains("comtrade-key") && !r.is_fallback()));
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|req| !req.url.as_str().contains("comtrade-key")));
}

#[tokio::test]
async fn comtrade_without_hs_code_makes_no_request() {
    let server = MockServer::start().await;
    let ctx = context("http://proxy.invalid/", StaticCredentials::new());

    let results = comtrade(&server)
        .search(&ctx, &bearing_query(), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_data["reason"], "no_records");
    assert!(results[0].website.starts_with("https://comtradeplus.un.org/TradeFlow"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn comtrade_server_failure_yields_fetch_failed_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let ctx = context("http://proxy.invalid/", StaticCredentials::new());

    let params = bearing_query().with_hs_code("848210");
    let results = comtrade(&server).search(&ctx, &params, 10).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_data["reason"], "fetch_failed");
    // two counted attempts under the test policy
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
