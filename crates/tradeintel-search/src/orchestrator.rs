//! Concurrent fan-out over the selected sources and aggregation of their
//! results into one ranked list.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinError;
use tokio::time::Instant;

use crate::error::{SearchError, SourceError};
use crate::params::SearchParams;
use crate::scorer::score;
use crate::sources::{SourceAdapter, SourceContext, SourceRegistry};
use crate::types::{AggregateResult, RawResult, SourceOutcome};

pub const UNKNOWN_SOURCE: &str = "unknown source";

/// One entry of the de-duplicated fan-out plan.
struct Planned {
    /// Caller's first spelling; the `bySource` key.
    key: String,
    adapter: Option<Arc<dyn SourceAdapter>>,
}

/// Runs every selected adapter concurrently and merges what they return.
///
/// Stateless between calls: each search is a pure function of the
/// parameters, the selected sources and what the adapters return.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    ctx: Arc<SourceContext>,
    budget: Duration,
}

impl Orchestrator {
    /// `budget` bounds the whole fan-out; adapters still running when it
    /// elapses are aborted and reported as timed out.
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>, ctx: Arc<SourceContext>, budget: Duration) -> Self {
        Self {
            registry,
            ctx,
            budget,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Searches every source in `selected` and returns the merged, ranked
    /// aggregate.
    ///
    /// Per-source failures (errors, panics, budget overruns, unknown names)
    /// become error outcomes in `by_source` and never fail the call. Results
    /// are sorted by score, highest first; ties keep fan-out order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidLimit`] if `max_per_source` is zero.
    pub async fn search_all_sources(
        &self,
        params: &SearchParams,
        selected: &[String],
        max_per_source: usize,
    ) -> Result<AggregateResult, SearchError> {
        if max_per_source == 0 {
            return Err(SearchError::InvalidLimit);
        }

        let plan = self.plan(selected);
        if plan.is_empty() {
            return Ok(AggregateResult::empty());
        }

        let started = Instant::now();
        let deadline = started + self.budget;
        let shared = Arc::new(params.clone());
        tracing::info!(
            sources = plan.len(),
            max_per_source,
            query = %params.query(),
            "starting source fan-out"
        );

        let runs = plan.iter().map(|entry| {
            let adapter = entry.adapter.clone();
            let key = entry.key.clone();
            let ctx = Arc::clone(&self.ctx);
            let params = Arc::clone(&shared);
            let budget = self.budget;
            async move {
                match adapter {
                    Some(adapter) => {
                        run_adapter(adapter, ctx, params, max_per_source, deadline, budget, &key)
                            .await
                    }
                    None => SourceOutcome::Error(UNKNOWN_SOURCE.to_string()),
                }
            }
        });
        let outcomes = join_all(runs).await;

        let aggregate = aggregate(&plan, outcomes, params, max_per_source);
        tracing::info!(
            total = aggregate.total,
            failed = aggregate.by_source.values().filter(|o| o.is_error()).count(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "source fan-out finished"
        );
        Ok(aggregate)
    }

    /// De-duplicates `selected` by canonical adapter id (unknown names by
    /// their lowercase spelling), keeping the first spelling and order.
    fn plan(&self, selected: &[String]) -> Vec<Planned> {
        let mut seen = HashSet::new();
        let mut plan = Vec::new();
        for name in selected {
            let key = name.trim();
            if key.is_empty() {
                continue;
            }
            let adapter = self.registry.resolve(key);
            let canonical = adapter
                .as_ref()
                .map_or_else(|| key.to_lowercase(), |a| a.id().to_string());
            if seen.insert(canonical) {
                plan.push(Planned {
                    key: key.to_string(),
                    adapter,
                });
            } else {
                tracing::debug!(source = key, "duplicate source selection ignored");
            }
        }
        plan
    }
}

/// Spawns one adapter as its own task and waits for it until `deadline`.
async fn run_adapter(
    adapter: Arc<dyn SourceAdapter>,
    ctx: Arc<SourceContext>,
    params: Arc<SearchParams>,
    max_results: usize,
    deadline: Instant,
    budget: Duration,
    key: &str,
) -> SourceOutcome {
    let id = adapter.id();
    let mut handle = tokio::spawn(async move {
        adapter.search(&ctx, &params, max_results).await
    });

    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(Ok(results))) => {
            tracing::debug!(source = key, id, count = results.len(), "source finished");
            SourceOutcome::Results(results)
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(source = key, id, error = %e, "source failed");
            SourceOutcome::Error(e.to_string())
        }
        Ok(Err(join_error)) => {
            let message = join_failure(&join_error);
            tracing::error!(source = key, id, error = %message, "source task died");
            SourceOutcome::Error(message)
        }
        Err(_) => {
            handle.abort();
            let e = SourceError::Timeout {
                source_name: key.to_string(),
                message: format!("no response within {}s", budget.as_secs_f64()),
            };
            tracing::warn!(source = key, id, error = %e, "source exceeded search budget");
            SourceOutcome::Error(e.to_string())
        }
    }
}

fn join_failure(err: &JoinError) -> String {
    if err.is_panic() {
        "source adapter panicked".to_string()
    } else {
        "source task was cancelled".to_string()
    }
}

/// Post-processes each source's list in plan order, then ranks the union.
fn aggregate(
    plan: &[Planned],
    outcomes: Vec<SourceOutcome>,
    params: &SearchParams,
    max_per_source: usize,
) -> AggregateResult {
    let mut by_source = BTreeMap::new();
    let mut results = Vec::new();
    let mut sources_searched = Vec::with_capacity(plan.len());

    for (entry, outcome) in plan.iter().zip(outcomes) {
        sources_searched.push(entry.key.clone());
        let outcome = match outcome {
            SourceOutcome::Results(list) => {
                let list = finalize(list, params, max_per_source);
                results.extend(list.iter().cloned());
                SourceOutcome::Results(list)
            }
            error @ SourceOutcome::Error(_) => error,
        };
        by_source.insert(entry.key.clone(), outcome);
    }

    // stable: equal scores keep fan-out order
    results.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

    AggregateResult {
        total: results.len(),
        results,
        by_source,
        sources_searched,
    }
}

/// Caps, drops exact duplicates, re-scores and validates one source's list.
fn finalize(list: Vec<RawResult>, params: &SearchParams, max_per_source: usize) -> Vec<RawResult> {
    let mut seen = HashSet::new();
    list.into_iter()
        .filter(|r| seen.insert((r.website.clone(), r.company_name.clone())))
        .take(max_per_source)
        .map(|mut r| {
            r.relevance_score = score(&r, params);
            r.validate_website();
            r
        })
        .collect()
}
