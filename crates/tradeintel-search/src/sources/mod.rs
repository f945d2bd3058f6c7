//! Source adapters and the registry that maps source names onto them.
//!
//! Every adapter follows the same shape: build a request URL from the
//! query, fetch it through the shared [`Fetcher`], parse records with
//! selectors tried in preference order, and fall back to a single
//! self-explanatory stand-in result when live data is unavailable.

mod comtrade;
mod directory;
mod engines;
mod trademap;
mod tradekey;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::client::{Accept, FetchRequest, Fetcher};
use crate::credentials::{CredentialStore, PROXY_KEY};
use crate::error::{RecordError, SourceError};
use crate::params::SearchParams;
use crate::types::{FallbackReason, RawResult};

pub use comtrade::UnComtrade;
pub use directory::DirectoryAdapter;
pub use engines::SearchEngine;
pub use trademap::TradeMap;
pub use tradekey::TradeKeyLeads;

/// Provisional score for fallback stand-ins; the orchestrator re-scores.
const FALLBACK_SCORE: u8 = 40;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9.+_-]+@[a-zA-Z0-9._-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SearchEngine,
    TradeDatabase,
    Marketplace,
}

/// Shared, read-only collaborators handed to every adapter invocation.
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<Fetcher>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl SourceContext {
    #[must_use]
    pub fn new(fetcher: Arc<Fetcher>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            fetcher,
            credentials,
        }
    }

    #[must_use]
    pub fn proxy_key(&self) -> Option<String> {
        self.credentials.get(PROXY_KEY)
    }
}

impl std::fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContext")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

/// Uniform search contract implemented once per external source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable lowercase identifier, e.g. `google`.
    fn id(&self) -> &'static str;

    /// Display name.
    fn label(&self) -> &'static str;

    /// Extra names accepted by [`SourceRegistry::resolve`], matched case-insensitively.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn kind(&self) -> SourceKind;

    /// Whether live data needs the scraping-proxy credential.
    fn requires_proxy(&self) -> bool {
        false
    }

    /// Returns up to `max_results` records. When live data is unavailable
    /// the list holds exactly one fallback stand-in instead of being empty.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] only for failures that leave the adapter unable
    /// to produce even a fallback, such as an unbuildable request URL.
    async fn search(
        &self,
        ctx: &SourceContext,
        params: &SearchParams,
        max_results: usize,
    ) -> Result<Vec<RawResult>, SourceError>;
}

/// Registry entry as exposed to API and CLI listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: SourceKind,
    pub requires_proxy: bool,
    pub aliases: &'static [&'static str],
}

/// Immutable name → adapter map, built once at startup.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every adapter shipped with the crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for engine in engines::all() {
            registry = registry.with(engine);
        }
        for directory in directory::all() {
            registry = registry.with(directory);
        }
        registry
            .with(TradeMap)
            .with(UnComtrade::default())
            .with(TradeKeyLeads)
    }

    /// Registers `adapter`, replacing any adapter with the same id.
    #[must_use]
    pub fn with(self, adapter: impl SourceAdapter + 'static) -> Self {
        self.with_arc(Arc::new(adapter))
    }

    #[must_use]
    pub fn with_arc(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        if let Some(slot) = self.adapters.iter_mut().find(|a| a.id() == adapter.id()) {
            *slot = adapter;
        } else {
            self.adapters.push(adapter);
        }
        self
    }

    /// Looks `name` up by id or alias, ignoring case and surrounding space.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.adapters
            .iter()
            .find(|a| {
                a.id() == needle || a.aliases().iter().any(|alias| alias.to_lowercase() == needle)
            })
            .cloned()
    }

    #[must_use]
    pub fn describe(&self) -> Vec<SourceInfo> {
        self.adapters
            .iter()
            .map(|a| SourceInfo {
                id: a.id(),
                label: a.label(),
                kind: a.kind(),
                requires_proxy: a.requires_proxy(),
                aliases: a.aliases(),
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.id()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Shared page flow
// ---------------------------------------------------------------------------

/// How one adapter fetches its search page.
#[derive(Debug, Clone)]
pub(crate) struct PageRequest<'a> {
    pub source: &'static str,
    pub url: &'a str,
    pub requires_proxy: bool,
    pub render_javascript: bool,
    pub region: &'a str,
    pub accept: Accept,
}

impl<'a> PageRequest<'a> {
    pub(crate) fn html(source: &'static str, url: &'a str) -> Self {
        Self {
            source,
            url,
            requires_proxy: false,
            render_javascript: false,
            region: "",
            accept: Accept::Html,
        }
    }
}

/// Result of trying to obtain a page body.
#[derive(Debug)]
pub(crate) enum Page {
    Body(String),
    Unavailable { reason: FallbackReason, note: String },
}

/// Fetches the page, or explains why it could not be fetched.
///
/// A configured proxy key is always used when present; when the source
/// needs the proxy and no key is configured, no request is made.
pub(crate) async fn fetch_page(ctx: &SourceContext, page: &PageRequest<'_>) -> Page {
    let proxy_key = ctx.proxy_key();
    if page.requires_proxy && proxy_key.is_none() {
        tracing::info!(
            source = page.source,
            "scraping proxy key not configured; returning fallback link"
        );
        return Page::Unavailable {
            reason: FallbackReason::MissingCredential,
            note: format!(
                "Live results need the scraping proxy key ({PROXY_KEY}); open the link to search manually."
            ),
        };
    }

    let request = FetchRequest::new(page.url)
        .via_proxy(proxy_key.as_deref())
        .render_javascript(page.render_javascript)
        .region(page.region)
        .accept(page.accept);

    match ctx.fetcher.fetch(&request).await {
        Ok(body) => Page::Body(body),
        Err(e) => {
            tracing::warn!(
                source = page.source,
                url = page.url,
                classification = e.classification(),
                error = %e,
                "source fetch failed"
            );
            Page::Unavailable {
                reason: FallbackReason::FetchFailed,
                note: format!(
                    "Live fetch failed ({}); open the link to search manually.",
                    e.classification()
                ),
            }
        }
    }
}

/// Describes the stand-in result an adapter emits when it has no live records.
#[derive(Debug, Clone)]
pub(crate) struct Fallback {
    pub source: &'static str,
    pub title: String,
    pub country: String,
    pub website: String,
    pub product_match: String,
}

impl Fallback {
    pub(crate) fn result(&self, reason: FallbackReason, note: &str) -> RawResult {
        let mut result = RawResult::new(self.source)
            .with_company_name(&self.title)
            .with_country(&self.country)
            .with_website(&self.website)
            .with_product_match(&self.product_match)
            .into_fallback(reason, note);
        result.relevance_score = FALLBACK_SCORE;
        result
    }

    pub(crate) fn no_records(&self) -> RawResult {
        self.result(
            FallbackReason::NoRecords,
            "No records could be extracted from the page; open the link to review it manually.",
        )
    }
}

/// Runs the common fetch → parse → fallback flow.
///
/// `parse` receives the page body and yields one entry per candidate record;
/// failed entries are logged and skipped.
pub(crate) async fn scrape<F>(
    ctx: &SourceContext,
    page: &PageRequest<'_>,
    fallback: &Fallback,
    max_results: usize,
    parse: F,
) -> Vec<RawResult>
where
    F: FnOnce(&str) -> Vec<Result<RawResult, RecordError>>,
{
    let body = match fetch_page(ctx, page).await {
        Page::Body(body) => body,
        Page::Unavailable { reason, note } => return vec![fallback.result(reason, &note)],
    };

    let results = collect_records(page.source, parse(&body), max_results);
    if results.is_empty() {
        tracing::info!(source = page.source, url = page.url, "no usable records on page");
        return vec![fallback.no_records()];
    }
    tracing::debug!(source = page.source, count = results.len(), "parsed records");
    results
}

/// Keeps successfully mapped records, up to `max_results`.
pub(crate) fn collect_records(
    source: &str,
    records: Vec<Result<RawResult, RecordError>>,
    max_results: usize,
) -> Vec<RawResult> {
    records
        .into_iter()
        .filter_map(|record| match record {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(source, error = %e, "skipped record");
                None
            }
        })
        .take(max_results)
        .collect()
}

// ---------------------------------------------------------------------------
// Selector helpers
// ---------------------------------------------------------------------------

/// Parses selectors, dropping (and logging) any that fail to parse.
pub(crate) fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!(selector = raw, error = %e, "invalid CSS selector skipped");
                None
            }
        })
        .collect()
}

/// Nodes matched by the first selector (in preference order) that matches anything.
pub(crate) fn select_cards<'a>(doc: &'a Html, candidates: &[Selector]) -> Vec<ElementRef<'a>> {
    for selector in candidates {
        let cards: Vec<ElementRef<'a>> = doc.select(selector).collect();
        if !cards.is_empty() {
            return cards;
        }
    }
    Vec::new()
}

/// First node under `scope` matched by the earliest matching selector.
pub(crate) fn first_match<'a>(
    scope: ElementRef<'a>,
    candidates: &[Selector],
) -> Option<ElementRef<'a>> {
    candidates
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

/// Concatenated text content of a node, space-joined.
pub(crate) fn text_of(node: ElementRef<'_>) -> String {
    node.text().collect::<Vec<_>>().join(" ")
}

/// Text of the first node matched by `candidates`, or `""`.
pub(crate) fn text_in(scope: ElementRef<'_>, candidates: &[Selector]) -> String {
    first_match(scope, candidates).map(text_of).unwrap_or_default()
}

/// `href` of the first node matched by `candidates`, or `""`.
pub(crate) fn href_in(scope: ElementRef<'_>, candidates: &[Selector]) -> String {
    first_match(scope, candidates)
        .and_then(|node| node.value().attr("href"))
        .unwrap_or_default()
        .to_string()
}

/// First email address in `text`.
pub(crate) fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}
