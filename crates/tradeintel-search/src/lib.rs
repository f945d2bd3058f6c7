//! Multi-source B2B buyer and supplier search.
//!
//! A [`SearchParams`] query fans out concurrently to the selected
//! [`SourceAdapter`]s (search engines, trade databases, directories and
//! marketplaces). Their results are re-scored, validated and merged by the
//! [`Orchestrator`] into one [`AggregateResult`].

pub mod client;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod params;
pub mod rate_limit;
pub mod scorer;
pub mod sources;
pub mod types;
pub mod urls;

pub use client::{Accept, FetchRequest, Fetcher, FetcherConfig};
pub use credentials::{CredentialStore, EnvCredentials, StaticCredentials};
pub use error::{FetchError, RecordError, SearchError, SourceError};
pub use orchestrator::Orchestrator;
pub use params::SearchParams;
pub use rate_limit::RetryPolicy;
pub use sources::{SourceAdapter, SourceContext, SourceInfo, SourceKind, SourceRegistry};
pub use types::{AggregateResult, FallbackReason, RawResult, SourceOutcome};
