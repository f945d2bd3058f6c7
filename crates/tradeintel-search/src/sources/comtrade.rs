//! UN Comtrade public API: bilateral import flows for an HS heading.

use async_trait::async_trait;
use serde::Deserialize;

use super::{collect_records, Fallback, SourceAdapter, SourceContext, SourceKind};
use crate::client::{Accept, FetchRequest};
use crate::credentials::COMTRADE_KEY;
use crate::error::{RecordError, SourceError};
use crate::params::SearchParams;
use crate::types::{FallbackReason, RawResult};
use crate::urls::SearchUrl;

const DEFAULT_API_BASE: &str = "https://comtradeapi.un.org/data/v1/get/C/A/HS";
const BROWSE_URL: &str = "https://comtradeplus.un.org/TradeFlow";
const DEFAULT_PERIOD: u16 = 2023;
const MAX_RECORDS: &str = "20";
const LIVE_SCORE: u8 = 70;
const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Rows are decoded one at a time in `parse_flows`.
#[derive(Debug, Deserialize)]
struct ComtradeResponse {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    dataset: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct FlowRecord {
    #[serde(rename = "reporterDesc", alias = "rtTitle", default)]
    reporter: Option<String>,
    #[serde(rename = "partnerDesc", alias = "ptTitle", default)]
    partner: Option<String>,
    #[serde(rename = "primaryValue", alias = "TradeValue", default)]
    value: Option<serde_json::Value>,
}

/// Queries the Comtrade data API directly (no scraping proxy). A
/// subscription key is sent when `COMTRADE_API_KEY` is configured.
#[derive(Debug, Clone)]
pub struct UnComtrade {
    api_base: String,
    period: u16,
}

impl Default for UnComtrade {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            period: DEFAULT_PERIOD,
        }
    }
}

impl UnComtrade {
    #[must_use]
    pub fn new(api_base: &str, period: u16) -> Self {
        Self {
            api_base: api_base.to_string(),
            period,
        }
    }

    fn partner(params: &SearchParams) -> String {
        match params.country_code() {
            "" => "all".to_string(),
            code => code.to_ascii_uppercase(),
        }
    }

    /// API request for `hs6`, without any key.
    fn api_url(&self, params: &SearchParams, hs6: &str) -> Result<String, SourceError> {
        Ok(SearchUrl::parse(&self.api_base)?
            .query("cmdCode", hs6)
            .query("reporterCode", "all")
            .query("period", &self.period.to_string())
            .query("partnerCode", &Self::partner(params))
            .query("motCode", "0")
            .query("maxRecords", MAX_RECORDS)
            .build())
    }

    /// Human-browsable trade-flow page, used as the fallback link.
    fn browse_url(&self, params: &SearchParams) -> Result<String, SourceError> {
        Ok(SearchUrl::parse(BROWSE_URL)?
            .query("Frequency", "A")
            .query("Flows", "M")
            .query_opt("CommodityCode", &params.hs6())
            .query("Partner", &Self::partner(params))
            .query("Period", &self.period.to_string())
            .build())
    }
}

#[async_trait]
impl SourceAdapter for UnComtrade {
    fn id(&self) -> &'static str {
        "un_comtrade"
    }

    fn label(&self) -> &'static str {
        "UN Comtrade"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["un comtrade", "comtrade"]
    }

    fn kind(&self) -> SourceKind {
        SourceKind::TradeDatabase
    }

    async fn search(
        &self,
        ctx: &SourceContext,
        params: &SearchParams,
        max_results: usize,
    ) -> Result<Vec<RawResult>, SourceError> {
        let hs6 = params.hs6();
        let subject = if hs6.is_empty() { params.query() } else { hs6.clone() };
        let fallback = Fallback {
            source: self.id(),
            title: format!("HS {subject}: UN Comtrade"),
            country: match params.target_country() {
                "" => "Global".to_string(),
                c => c.to_string(),
            },
            website: self.browse_url(params)?,
            product_match: subject.clone(),
        };

        if hs6.is_empty() {
            return Ok(vec![fallback.result(
                FallbackReason::NoRecords,
                "UN Comtrade lookups need an HS code; open the link to browse trade flows.",
            )]);
        }

        let public_url = self.api_url(params, &hs6)?;
        let key = ctx.credentials.get(COMTRADE_KEY);
        let request = FetchRequest::new(&public_url)
            .accept(Accept::Json)
            .api_key_header(SUBSCRIPTION_HEADER, key.as_deref());
        let body = match ctx.fetcher.fetch(&request).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    source = self.id(),
                    keyed = key.is_some(),
                    classification = e.classification(),
                    error = %e,
                    "comtrade request failed"
                );
                return Ok(vec![fallback.result(
                    FallbackReason::FetchFailed,
                    &format!(
                        "UN Comtrade API unavailable ({}); a free subscription key may be required.",
                        e.classification()
                    ),
                )]);
            }
        };

        let records = match parse_flows(&body, &public_url, &hs6) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(source = self.id(), error = %e, "comtrade response is not valid JSON");
                Vec::new()
            }
        };
        let results = collect_records(self.id(), records, max_results);
        if results.is_empty() {
            return Ok(vec![fallback.no_records()]);
        }
        Ok(results)
    }
}

fn parse_flows(
    body: &str,
    public_url: &str,
    hs6: &str,
) -> Result<Vec<Result<RawResult, RecordError>>, serde_json::Error> {
    let response: ComtradeResponse = serde_json::from_str(body)?;
    let flows = response
        .data
        .filter(|d| !d.is_empty())
        .or(response.dataset)
        .unwrap_or_default();

    Ok(flows
        .into_iter()
        .map(|row| {
            let flow: FlowRecord =
                serde_json::from_value(row).map_err(|e| RecordError::Malformed(e.to_string()))?;
            let reporter = flow
                .reporter
                .filter(|r| !r.trim().is_empty())
                .ok_or(RecordError::Missing("reporter"))?;
            let partner = flow.partner.unwrap_or_default();
            let mut result = RawResult::new("un_comtrade")
                .with_company_name(&format!("{reporter} → {partner}"))
                .with_country(&reporter)
                .with_website(public_url)
                .with_product_match(hs6)
                .with_raw("cmdCode", hs6)
                .with_raw("partner", partner.as_str())
                .with_raw("tradeValueUsd", flow.value.unwrap_or(serde_json::Value::Null));
            result.relevance_score = LIVE_SCORE;
            Ok(result)
        })
        .collect())
}
