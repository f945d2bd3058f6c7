//! Orchestrator behaviour against scripted in-process adapters: fault
//! isolation, ranking determinism, the search budget and aggregation rules.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use tradeintel_search::orchestrator::UNKNOWN_SOURCE;
use tradeintel_search::{
    Fetcher, FetcherConfig, Orchestrator, RawResult, SearchError, SearchParams, SourceAdapter,
    SourceContext, SourceError, SourceKind, SourceRegistry, StaticCredentials,
};

enum Script {
    Results(Vec<RawResult>),
    Fail,
    Panic,
}

/// Adapter that waits `delay`, then follows its script.
struct Scripted {
    id: &'static str,
    delay: Duration,
    script: Script,
}

impl Scripted {
    fn returning(id: &'static str, results: Vec<RawResult>) -> Self {
        Self {
            id,
            delay: Duration::ZERO,
            script: Script::Results(results),
        }
    }

    fn failing(id: &'static str) -> Self {
        Self {
            id,
            delay: Duration::ZERO,
            script: Script::Fail,
        }
    }

    fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SourceAdapter for Scripted {
    fn id(&self) -> &'static str {
        self.id
    }

    fn label(&self) -> &'static str {
        self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::TradeDatabase
    }

    async fn search(
        &self,
        _ctx: &SourceContext,
        _params: &SearchParams,
        _max_results: usize,
    ) -> Result<Vec<RawResult>, SourceError> {
        tokio::time::sleep(self.delay).await;
        match &self.script {
            Script::Results(results) => Ok(results.clone()),
            Script::Fail => Err(SourceError::Timeout {
                source_name: self.id.to_string(),
                message: "upstream did not answer".to_string(),
            }),
            Script::Panic => panic!("scripted adapter panic"),
        }
    }
}

fn orchestrator(adapters: Vec<Scripted>, budget: Duration) -> Orchestrator {
    let registry = adapters
        .into_iter()
        .fold(SourceRegistry::empty(), |registry, adapter| registry.with(adapter));
    let fetcher = Fetcher::new(&FetcherConfig::default()).expect("default fetcher");
    let ctx = SourceContext::new(Arc::new(fetcher), Arc::new(StaticCredentials::new()));
    Orchestrator::new(Arc::new(registry), Arc::new(ctx), budget)
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn company(source: &str, name: &str, website: &str) -> RawResult {
    RawResult::new(source)
        .with_company_name(name)
        .with_website(website)
}

fn schaeffler() -> RawResult {
    RawResult::new("google")
        .with_company_name("Schaeffler AG")
        .with_country("Germany")
        .with_website("https://schaeffler.com")
        .with_product_match("ball bearing")
}

// ---------------------------------------------------------------------------
// Fault isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schaeffler_scenario_ranks_google_and_reports_kompass_failure() {
    let orchestrator = orchestrator(
        vec![
            Scripted::returning("google", vec![schaeffler()]),
            Scripted::failing("kompass"),
        ],
        Duration::from_secs(5),
    );
    let params = SearchParams::new("ball bearing").with_target_country("Germany");

    let aggregate = orchestrator
        .search_all_sources(&params, &names(&["google", "kompass"]), 10)
        .await
        .expect("per-source failures never fail the search");

    assert_eq!(aggregate.total, 1);
    assert_eq!(aggregate.results[0].company_name, "Schaeffler AG");
    assert!(aggregate.results[0].relevance_score >= 78);
    assert_eq!(aggregate.results[0].url_status, Some(200));
    assert!(aggregate.by_source["kompass"]
        .error()
        .is_some_and(|e| e.contains("timed out")));
    assert_eq!(aggregate.by_source["google"].results().len(), 1);
    assert_eq!(aggregate.sources_searched, names(&["google", "kompass"]));
}

#[tokio::test]
async fn panicking_adapter_is_reported_not_propagated() {
    let orchestrator = orchestrator(
        vec![
            Scripted {
                id: "broken",
                delay: Duration::ZERO,
                script: Script::Panic,
            },
            Scripted::returning("steady", vec![company("steady", "Acme", "https://acme.example")]),
        ],
        Duration::from_secs(5),
    );

    let aggregate = orchestrator
        .search_all_sources(&SearchParams::new("valve"), &names(&["broken", "steady"]), 10)
        .await
        .unwrap();

    assert_eq!(aggregate.total, 1);
    assert!(aggregate.by_source["broken"]
        .error()
        .is_some_and(|e| e.contains("panicked")));
    assert!(!aggregate.by_source["steady"].is_error());
}

#[tokio::test]
async fn slow_adapter_times_out_within_budget() {
    let orchestrator = orchestrator(
        vec![
            Scripted::returning("slow", vec![company("slow", "Late Ltd", "")])
                .after(Duration::from_secs(30)),
            Scripted::returning("fast", vec![company("fast", "Quick Co", "")]),
        ],
        Duration::from_millis(200),
    );

    let started = Instant::now();
    let aggregate = orchestrator
        .search_all_sources(&SearchParams::new("valve"), &names(&["slow", "fast"]), 10)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(aggregate.total, 1);
    assert_eq!(aggregate.results[0].company_name, "Quick Co");
    assert!(aggregate.by_source["slow"]
        .error()
        .is_some_and(|e| e.contains("slow timed out")));
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn output_is_identical_regardless_of_completion_order() {
    let first_results = vec![
        company("first", "Alpha Valves", "https://alpha.example"),
        company("first", "Beta", "https://beta.example"),
    ];
    let second_results = vec![
        company("second", "Gamma Valves", "https://gamma.example"),
        company("second", "Delta", ""),
    ];
    let params = SearchParams::new("valves");
    let selection = names(&["first", "second"]);

    let first_slow = orchestrator(
        vec![
            Scripted::returning("first", first_results.clone()).after(Duration::from_millis(60)),
            Scripted::returning("second", second_results.clone()),
        ],
        Duration::from_secs(5),
    );
    let second_slow = orchestrator(
        vec![
            Scripted::returning("first", first_results),
            Scripted::returning("second", second_results).after(Duration::from_millis(60)),
        ],
        Duration::from_secs(5),
    );

    let a = first_slow.search_all_sources(&params, &selection, 10).await.unwrap();
    let b = second_slow.search_all_sources(&params, &selection, 10).await.unwrap();

    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    let order: Vec<&str> = a.results.iter().map(|r| r.company_name.as_str()).collect();
    // equal scores keep source-selection order
    assert_eq!(order, vec!["Alpha Valves", "Gamma Valves", "Beta", "Delta"]);
}

#[tokio::test]
async fn adapter_scores_are_replaced() {
    let mut inflated = company("src", "Nobody", "");
    inflated.relevance_score = 99;
    let orchestrator = orchestrator(
        vec![Scripted::returning("src", vec![inflated])],
        Duration::from_secs(5),
    );

    let aggregate = orchestrator
        .search_all_sources(&SearchParams::new("valve"), &names(&["src"]), 10)
        .await
        .unwrap();

    // base 50, plus 15 because the empty country equals the unset target
    assert_eq!(aggregate.results[0].relevance_score, 65);
}

// ---------------------------------------------------------------------------
// Aggregation rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_and_duplicate_sources() {
    let orchestrator = orchestrator(
        vec![Scripted::returning("kompass", vec![company("kompass", "Acme", "")])],
        Duration::from_secs(5),
    );

    let aggregate = orchestrator
        .search_all_sources(
            &SearchParams::new("valve"),
            &names(&["Kompass", "kompass", "altavista"]),
            10,
        )
        .await
        .unwrap();

    assert_eq!(aggregate.sources_searched, names(&["Kompass", "altavista"]));
    assert_eq!(aggregate.total, 1);
    assert_eq!(aggregate.by_source["altavista"].error(), Some(UNKNOWN_SOURCE));
    assert_eq!(aggregate.by_source["Kompass"].results().len(), 1);
}

#[tokio::test]
async fn invalid_websites_are_cleared_and_lists_capped() {
    let orchestrator = orchestrator(
        vec![Scripted::returning(
            "src",
            vec![
                company("src", "Broken Link", "ftp://files.example/list"),
                company("src", "Good Link", "https://good.example"),
                company("src", "Over Cap", "https://over.example"),
            ],
        )],
        Duration::from_secs(5),
    );

    let aggregate = orchestrator
        .search_all_sources(&SearchParams::new("valve"), &names(&["src"]), 2)
        .await
        .unwrap();

    assert_eq!(aggregate.total, 2);
    let broken = aggregate
        .results
        .iter()
        .find(|r| r.company_name == "Broken Link")
        .unwrap();
    assert!(broken.website.is_empty());
    assert_eq!(broken.url_status, None);
    assert!(aggregate.results.iter().all(|r| r.company_name != "Over Cap"));
}

#[tokio::test]
async fn zero_max_per_source_fails_the_search() {
    let orchestrator = orchestrator(vec![], Duration::from_secs(5));
    let err = orchestrator
        .search_all_sources(&SearchParams::new("valve"), &names(&["google"]), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidLimit));
}

#[tokio::test]
async fn empty_selection_is_an_empty_aggregate() {
    let orchestrator = orchestrator(vec![], Duration::from_secs(5));
    let aggregate = orchestrator
        .search_all_sources(&SearchParams::new("valve"), &[], 10)
        .await
        .unwrap();
    assert_eq!(aggregate.total, 0);
    assert!(aggregate.by_source.is_empty());
}
