//! `search` and `sources` command handlers.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tradeintel_search::{
    EnvCredentials, Fetcher, FetcherConfig, Orchestrator, SearchParams, SourceContext,
    SourceRegistry,
};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Product name or free-text description
    #[arg(long)]
    pub product: Option<String>,
    /// HS (GTIP) code, e.g. 8482.10
    #[arg(long)]
    pub hs_code: Option<String>,
    /// OEM / part number
    #[arg(long)]
    pub oem: Option<String>,
    /// Target country (English or Turkish name)
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long, default_value = "en")]
    pub language: String,
    /// Related sectors, appended to the query
    #[arg(long)]
    pub sectors: Option<String>,
    /// Competitor brands, appended to the query
    #[arg(long)]
    pub brands: Option<String>,
    /// Source id or alias; repeat for several. Defaults to every registered source
    #[arg(long = "source")]
    pub sources: Vec<String>,
    /// Results kept per source (defaults to TRADEINTEL_DEFAULT_MAX_RESULTS)
    #[arg(long)]
    pub max: Option<usize>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl SearchArgs {
    pub(crate) fn params(&self) -> SearchParams {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        SearchParams::new(&field(&self.product))
            .with_hs_code(&field(&self.hs_code))
            .with_oem_number(&field(&self.oem))
            .with_target_country(&field(&self.country))
            .with_language(&self.language)
            .with_related_sectors(&field(&self.sectors))
            .with_competitor_brands(&field(&self.brands))
    }
}

/// Runs one aggregate search with credentials from the environment and
/// prints the result as JSON on stdout.
///
/// # Errors
///
/// Returns an error if the query has no product, HS code or OEM number,
/// the fetcher cannot be built, `--max` is zero, or serialization fails.
pub(crate) async fn run_search(
    config: &tradeintel_core::AppConfig,
    args: SearchArgs,
) -> anyhow::Result<()> {
    let params = args.params();
    if params.is_blank() {
        anyhow::bail!("one of --product, --hs-code or --oem is required");
    }

    let registry = SourceRegistry::builtin();
    let sources: Vec<String> = if args.sources.is_empty() {
        registry
            .describe()
            .into_iter()
            .map(|info| info.id.to_string())
            .collect()
    } else {
        args.sources
    };

    let fetcher = Fetcher::new(&FetcherConfig::from_config(config))?;
    let ctx = SourceContext::new(Arc::new(fetcher), Arc::new(EnvCredentials));
    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(ctx),
        Duration::from_secs(config.search_budget_secs),
    );

    let max = args.max.unwrap_or(config.default_max_results);
    let aggregate = orchestrator.search_all_sources(&params, &sources, max).await?;
    tracing::info!(
        total = aggregate.total,
        sources = aggregate.sources_searched.len(),
        "search complete"
    );

    let output = if args.pretty {
        serde_json::to_string_pretty(&aggregate)?
    } else {
        serde_json::to_string(&aggregate)?
    };
    println!("{output}");
    Ok(())
}

/// Prints the registry as a table.
pub(crate) fn run_sources() {
    let registry = SourceRegistry::builtin();
    println!("{:<16}{:<24}{:<16}{:<7}ALIASES", "ID", "LABEL", "KIND", "PROXY");
    for info in registry.describe() {
        let kind = serde_json::to_value(info.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!(
            "{:<16}{:<24}{:<16}{:<7}{}",
            info.id,
            info.label,
            kind,
            if info.requires_proxy { "yes" } else { "no" },
            info.aliases.join(", ")
        );
    }
}
