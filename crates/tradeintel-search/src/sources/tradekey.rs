//! TradeKey buying leads (RFQs): buyers asking for a product, with the
//! requested quantity and posting date instead of a price.

use async_trait::async_trait;
use scraper::Html;

use super::{
    extract_email, href_in, scrape, select_cards, selectors, text_in, text_of, Fallback,
    PageRequest, SourceAdapter, SourceContext, SourceKind,
};
use crate::error::{RecordError, SourceError};
use crate::params::SearchParams;
use crate::types::RawResult;
use crate::urls::{clean_string, resolve_link, SearchUrl};

const BASE: &str = "https://www.tradekey.com";
const LIVE_SCORE: u8 = 65;

const LEADS: &[&str] = &[".rfq-list-item", "[class*='buying-lead']", "[class*='rfq-item']"];
const TITLE: &[&str] = &[".rfq-title", "h3", "h2"];
const COMPANY: &[&str] = &[".company-name", "[class*='company']"];
const COUNTRY: &[&str] = &[".country", "[class*='country']"];
const QUANTITY: &[&str] = &[".quantity", "[class*='quantity']", "[class*='qty']"];
const POSTED: &[&str] = &[".post-date", "[class*='date']"];
const LINK: &[&str] = &[".rfq-title a[href]", "a[href]"];

#[derive(Debug, Clone, Copy, Default)]
pub struct TradeKeyLeads;

impl TradeKeyLeads {
    /// `https://www.tradekey.com/buying-leads/<keyword-slug>.html`
    fn url(params: &SearchParams) -> Result<String, SourceError> {
        let slug = params
            .query()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        Ok(SearchUrl::parse(BASE)?
            .segment("buying-leads")
            .segment(&format!("{slug}.html"))
            .build())
    }
}

#[async_trait]
impl SourceAdapter for TradeKeyLeads {
    fn id(&self) -> &'static str {
        "tradekey"
    }

    fn label(&self) -> &'static str {
        "TradeKey"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["trade key", "tradekey rfq"]
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Marketplace
    }

    async fn search(
        &self,
        ctx: &SourceContext,
        params: &SearchParams,
        max_results: usize,
    ) -> Result<Vec<RawResult>, SourceError> {
        let url = Self::url(params)?;
        let query = params.query();
        let target_country = params.target_country();

        let page = PageRequest::html(self.id(), &url);
        let fallback = Fallback {
            source: self.id(),
            title: format!("{query}: TradeKey buying leads"),
            country: match target_country {
                "" => "Global".to_string(),
                c => c.to_string(),
            },
            website: url.clone(),
            product_match: query.clone(),
        };

        Ok(scrape(ctx, &page, &fallback, max_results, |html| {
            parse_leads(html, &url, target_country)
        })
        .await)
    }
}

/// Maps RFQ cards to records. With a target country set, leads naming a
/// different country are filtered out; leads naming none are kept.
fn parse_leads(
    html: &str,
    page_url: &str,
    target_country: &str,
) -> Vec<Result<RawResult, RecordError>> {
    let doc = Html::parse_document(html);
    let leads = selectors(LEADS);
    let title = selectors(TITLE);
    let company = selectors(COMPANY);
    let country = selectors(COUNTRY);
    let quantity = selectors(QUANTITY);
    let posted = selectors(POSTED);
    let link = selectors(LINK);
    let wanted = target_country.to_lowercase();

    select_cards(&doc, &leads)
        .into_iter()
        .map(|card| {
            let lead_title = clean_string(&text_in(card, &title), 200);
            let buyer = clean_string(&text_in(card, &company), 200);
            if lead_title.is_empty() && buyer.is_empty() {
                return Err(RecordError::Missing("title"));
            }

            let lead_country = clean_string(&text_in(card, &country), 100);
            if !wanted.is_empty()
                && !lead_country.is_empty()
                && !lead_country.to_lowercase().contains(&wanted)
            {
                return Err(RecordError::Filtered(format!(
                    "lead from {lead_country}, wanted {target_country}"
                )));
            }

            let qty = clean_string(&text_in(card, &quantity), 100);
            let date = clean_string(&text_in(card, &posted), 100);
            let website = resolve_link(&href_in(card, &link), BASE)
                .unwrap_or_else(|| page_url.to_string());
            let contact = extract_email(&text_of(card)).unwrap_or_default();

            let mut result = RawResult::new("tradekey")
                .with_company_name(if buyer.is_empty() { &lead_title } else { &buyer })
                .with_country(if lead_country.is_empty() {
                    target_country
                } else {
                    lead_country.as_str()
                })
                .with_contact(&contact)
                .with_website(&website)
                .with_product_match(&lead_summary(&lead_title, &qty, &date))
                .with_raw("type", "RFQ")
                .with_raw("title", lead_title.as_str())
                .with_raw("quantity", qty.as_str())
                .with_raw("postedDate", date.as_str());
            result.relevance_score = LIVE_SCORE;
            Ok(result)
        })
        .collect()
}

/// `"<title> | quantity: <q> | posted: <date>"`, skipping empty parts.
fn lead_summary(title: &str, quantity: &str, posted: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    if !title.is_empty() {
        parts.push(title.to_string());
    }
    if !quantity.is_empty() {
        parts.push(format!("quantity: {quantity}"));
    }
    if !posted.is_empty() {
        parts.push(format!("posted: {posted}"));
    }
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEADS_HTML: &str = r#"
        <ul>
          <li class="rfq-list-item">
            <div class="rfq-title"><a href="/buyer/rfq-991.html">Need 6204 ball bearings</a></div>
            <span class="company-name">Berlin Industrial Supply</span>
            <span class="country">Germany</span>
            <span class="quantity">20,000 pieces</span>
            <span class="post-date">2 days ago</span>
          </li>
          <li class="rfq-list-item">
            <div class="rfq-title">Bearings for agriculture</div>
            <span class="country">Brazil</span>
          </li>
          <li class="rfq-list-item">
            <div class="rfq-title">Deep groove bearings</div>
            <span class="quantity">500 sets</span>
          </li>
        </ul>
    "#;

    #[test]
    fn url_uses_keyword_slug() {
        let params = SearchParams::new("Ball Bearing").with_oem_number("6204-2RS");
        assert_eq!(
            TradeKeyLeads::url(&params).unwrap(),
            "https://www.tradekey.com/buying-leads/ball-bearing-6204-2rs.html"
        );
    }

    #[test]
    fn leads_carry_quantity_and_date() {
        let records = parse_leads(LEADS_HTML, "https://www.tradekey.com/buying-leads/x.html", "");
        let results: Vec<RawResult> = records.into_iter().filter_map(Result::ok).collect();
        assert_eq!(results.len(), 3);

        let first = &results[0];
        assert_eq!(first.company_name, "Berlin Industrial Supply");
        assert_eq!(first.country, "Germany");
        assert_eq!(
            first.product_match,
            "Need 6204 ball bearings | quantity: 20,000 pieces | posted: 2 days ago"
        );
        assert_eq!(first.website, "https://www.tradekey.com/buyer/rfq-991.html");
        assert_eq!(first.raw_data["type"], "RFQ");

        // no buyer name: the lead title stands in, and the search page is the link
        assert_eq!(results[1].company_name, "Bearings for agriculture");
        assert_eq!(results[1].website, "https://www.tradekey.com/buying-leads/x.html");
    }

    #[test]
    fn country_filter_drops_other_countries_only() {
        let records = parse_leads(LEADS_HTML, "https://www.tradekey.com/buying-leads/x.html", "germany");
        assert!(records[0].is_ok());
        assert!(matches!(records[1], Err(RecordError::Filtered(_))));
        // lead without a country is kept and stamped with the target
        let third = records[2].as_ref().unwrap();
        assert_eq!(third.country, "germany");
        assert_eq!(third.product_match, "Deep groove bearings | quantity: 500 sets");
    }

    #[test]
    fn summary_skips_empty_parts() {
        assert_eq!(lead_summary("", "", ""), "");
        assert_eq!(lead_summary("T", "", "today"), "T | posted: today");
    }
}
