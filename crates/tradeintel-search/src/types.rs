use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::urls::{clean_string, is_valid_url, normalize_url};

/// `rawData` key set to `true` on degraded-mode stand-in results.
pub const FALLBACK_KEY: &str = "fallback";
/// `rawData` key naming why live data was unavailable.
pub const REASON_KEY: &str = "reason";
/// `rawData` key holding a human-readable explanation.
pub const NOTE_KEY: &str = "note";

/// Provisional score adapters start from; the orchestrator re-scores anyway.
pub const BASE_SCORE: u8 = 50;

const MAX_COMPANY_LEN: usize = 200;
const MAX_COUNTRY_LEN: usize = 100;
const MAX_CONTACT_LEN: usize = 200;
const MAX_MATCH_LEN: usize = 200;

/// Why an adapter fell back to a synthetic stand-in result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingCredential,
    FetchFailed,
    NoRecords,
}

impl FallbackReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::MissingCredential => "missing_credential",
            FallbackReason::FetchFailed => "fetch_failed",
            FallbackReason::NoRecords => "no_records",
        }
    }
}

/// One result as emitted by a single source adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    pub source: String,
    pub company_name: String,
    pub country: String,
    pub contact: String,
    pub website: String,
    /// `Some(200)` once the website passed syntactic validation; `None` when
    /// the website is empty or was cleared.
    pub url_status: Option<u16>,
    pub product_match: String,
    pub relevance_score: u8,
    pub raw_data: BTreeMap<String, serde_json::Value>,
}

impl RawResult {
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            company_name: String::new(),
            country: String::new(),
            contact: String::new(),
            website: String::new(),
            url_status: None,
            product_match: String::new(),
            relevance_score: BASE_SCORE,
            raw_data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_company_name(mut self, value: &str) -> Self {
        self.company_name = clean_string(value, MAX_COMPANY_LEN);
        self
    }

    #[must_use]
    pub fn with_country(mut self, value: &str) -> Self {
        self.country = clean_string(value, MAX_COUNTRY_LEN);
        self
    }

    #[must_use]
    pub fn with_contact(mut self, value: &str) -> Self {
        self.contact = clean_string(value, MAX_CONTACT_LEN);
        self
    }

    /// Normalizes (but does not validate) the website; see [`validate_website`](Self::validate_website).
    #[must_use]
    pub fn with_website(mut self, value: &str) -> Self {
        self.website = normalize_url(value, "");
        self
    }

    #[must_use]
    pub fn with_product_match(mut self, value: &str) -> Self {
        self.product_match = clean_string(value, MAX_MATCH_LEN);
        self
    }

    #[must_use]
    pub fn with_raw(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.raw_data.insert(key.to_string(), value.into());
        self
    }

    /// Marks this result as a degraded-mode stand-in.
    #[must_use]
    pub fn into_fallback(self, reason: FallbackReason, note: &str) -> Self {
        self.with_raw(FALLBACK_KEY, true)
            .with_raw(REASON_KEY, reason.as_str())
            .with_raw(NOTE_KEY, note)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.raw_data
            .get(FALLBACK_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Clears an invalid website and records the syntactic validation result.
    pub fn validate_website(&mut self) {
        if !self.website.is_empty() && is_valid_url(&self.website) {
            self.url_status = Some(200);
        } else {
            self.website.clear();
            self.url_status = None;
        }
    }
}

/// Per-source outcome: either the records it produced or why it failed.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Results(Vec<RawResult>),
    Error(String),
}

impl SourceOutcome {
    #[must_use]
    pub fn results(&self) -> &[RawResult] {
        match self {
            SourceOutcome::Results(results) => results,
            SourceOutcome::Error(_) => &[],
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            SourceOutcome::Results(_) => None,
            SourceOutcome::Error(message) => Some(message),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, SourceOutcome::Error(_))
    }
}

/// Serialized as `{"results": [...], "error": null | "..."}`.
impl Serialize for SourceOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SourceOutcome", 2)?;
        state.serialize_field("results", self.results())?;
        state.serialize_field("error", &self.error())?;
        state.end()
    }
}

/// Final payload of one aggregate search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub results: Vec<RawResult>,
    pub by_source: BTreeMap<String, SourceOutcome>,
    pub total: usize,
    pub sources_searched: Vec<String>,
}

impl AggregateResult {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            by_source: BTreeMap::new(),
            total: 0,
            sources_searched: Vec::new(),
        }
    }
}
