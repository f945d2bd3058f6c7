//! ITC TradeMap importer statistics: one result per importing country.

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{
    scrape, select_cards, selectors, text_of, Fallback, PageRequest, SourceAdapter, SourceContext,
    SourceKind,
};
use crate::error::{RecordError, SourceError};
use crate::params::SearchParams;
use crate::types::RawResult;
use crate::urls::{clean_string, SearchUrl};

const BY_PRODUCT_URL: &str = "https://www.trademap.org/Country_SelProductCountry_TS.aspx";
const ALL_PRODUCTS_URL: &str = "https://www.trademap.org/Product_SelCountry_TS.aspx";
const WORLD: &str = "WLD";
const ROWS: &[&str] = &["tr[class*='Content']", "table.table tr", "table tr"];
const LIVE_SCORE: u8 = 72;

#[derive(Debug, Clone, Copy, Default)]
pub struct TradeMap;

impl TradeMap {
    /// Statistics page for the query's HS heading (or all products), viewed
    /// from the target country (or the world).
    fn url(params: &SearchParams) -> Result<String, SourceError> {
        let region = match params.country_code() {
            "" => WORLD.to_string(),
            code => code.to_ascii_uppercase(),
        };
        let hs6 = params.hs6();
        let (base, nvpm) = if hs6.is_empty() {
            (
                ALL_PRODUCTS_URL,
                format!("1|{region}||||||||1|1|1|2|1|1|2|1|1"),
            )
        } else {
            (
                BY_PRODUCT_URL,
                format!("1|{region}||||{hs6}|1|1|1|1|2|1|2|1|1"),
            )
        };
        Ok(SearchUrl::parse(base)?.query("nvpm", &nvpm).build())
    }
}

#[async_trait]
impl SourceAdapter for TradeMap {
    fn id(&self) -> &'static str {
        "trademap"
    }

    fn label(&self) -> &'static str {
        "TradeMap"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["trade map", "itc trademap"]
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
        let url = Self::url(params)?;
        let hs6 = params.hs6();
        let subject = if hs6.is_empty() { params.query() } else { hs6.clone() };
        let country = match params.target_country() {
            "" => "Global",
            c => c,
        };

        let page = PageRequest::html(self.id(), &url);
        let fallback = Fallback {
            source: self.id(),
            title: format!("HS {subject}: TradeMap statistics"),
            country: country.to_string(),
            website: url.clone(),
            product_match: subject.clone(),
        };

        Ok(scrape(ctx, &page, &fallback, max_results, |html| {
            parse_rows(html, &url, &hs6, &subject)
        })
        .await)
    }
}

fn parse_rows(
    html: &str,
    page_url: &str,
    hs6: &str,
    subject: &str,
) -> Vec<Result<RawResult, RecordError>> {
    let doc = Html::parse_document(html);
    let rows = selectors(ROWS);
    let Ok(cell) = Selector::parse("td") else {
        return Vec::new();
    };

    select_cards(&doc, &rows)
        .into_iter()
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&cell)
                .map(|td| clean_string(&text_of(td), 200))
                .collect();
            // header rows carry <th> only
            if cells.len() < 2 {
                return None;
            }
            Some(map_row(&cells, page_url, hs6, subject))
        })
        .collect()
}

fn map_row(
    cells: &[String],
    page_url: &str,
    hs6: &str,
    subject: &str,
) -> Result<RawResult, RecordError> {
    let country = cells[0].as_str();
    if country.is_empty() {
        return Err(RecordError::Missing("country"));
    }
    if matches!(country.to_lowercase().as_str(), "world" | "total") {
        return Err(RecordError::Filtered(format!("aggregate row \"{country}\"")));
    }

    let mut result = RawResult::new("trademap")
        .with_company_name(&format!("{country} importers"))
        .with_country(country)
        .with_website(page_url)
        .with_product_match(subject)
        .with_raw("hs6", hs6)
        .with_raw("tradeValue", cells[1].as_str());
    result.relevance_score = LIVE_SCORE;
    Ok(result)
}
