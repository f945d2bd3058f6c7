//! Trade databases, B2B directories and marketplaces that list companies as
//! result cards.
//!
//! Each source is a `DirectoryProfile`: request URL, card selectors and
//! the domain-specific extras (certifications, price, minimum order) worth
//! keeping in `rawData`.

use async_trait::async_trait;
use scraper::{ElementRef, Html};

use super::{
    extract_email, first_match, href_in, scrape, select_cards, selectors, text_in, text_of,
    Fallback, PageRequest, SourceAdapter, SourceContext, SourceKind,
};
use crate::error::{RecordError, SourceError};
use crate::params::SearchParams;
use crate::types::RawResult;
use crate::urls::{clean_string, resolve_link, SearchUrl};

const MAX_EXTRA_LEN: usize = 200;

/// Shape of an extra field pulled from a card.
#[derive(Debug, Clone, Copy)]
enum ExtraKind {
    /// First match, as one string.
    Text,
    /// Every match (and comma-separated parts), as a string array.
    List,
}

#[derive(Debug, Clone, Copy)]
struct Extra {
    key: &'static str,
    selectors: &'static [&'static str],
    kind: ExtraKind,
}

struct DirectoryProfile {
    id: &'static str,
    label: &'static str,
    aliases: &'static [&'static str],
    kind: SourceKind,
    base: &'static str,
    requires_proxy: bool,
    build_url: fn(&SearchParams) -> Result<String, SourceError>,
    /// Country used when a card names none, and on the fallback entry.
    default_country: &'static str,
    /// Provisional score for live records.
    score: u8,
    cards: &'static [&'static str],
    name: &'static [&'static str],
    country: &'static [&'static str],
    link: &'static [&'static str],
    /// Company website link, preferred over the listing link when present.
    website: &'static [&'static str],
    extras: &'static [Extra],
}

const NAME: &[&str] = &["h2", "h3", "[class*='name']", "[class*='title']"];
const COUNTRY: &[&str] = &["[class*='country']", "[class*='location']"];
const ANY_LINK: &[&str] = &["a[href]"];

fn keyword_url(base: &str, key: &str, params: &SearchParams) -> Result<String, SourceError> {
    Ok(SearchUrl::parse(base)?.query(key, &params.query()).build())
}

static TRADEATLAS: DirectoryProfile = DirectoryProfile {
    id: "tradeatlas",
    label: "TradeAtlas",
    aliases: &["trade atlas"],
    kind: SourceKind::TradeDatabase,
    base: "https://www.tradeatlas.com",
    requires_proxy: false,
    build_url: |params| keyword_url("https://www.tradeatlas.com/en/search", "q", params),
    default_country: "Global",
    score: 75,
    cards: &[".company-card", ".buyer-item", "[class*='company']", "[class*='buyer']"],
    name: NAME,
    country: COUNTRY,
    link: ANY_LINK,
    website: &[],
    extras: &[],
};

static IMPORTGENIUS: DirectoryProfile = DirectoryProfile {
    id: "importgenius",
    label: "ImportGenius",
    aliases: &["import genius"],
    kind: SourceKind::TradeDatabase,
    base: "https://www.importgenius.com",
    requires_proxy: true,
    build_url: |params| keyword_url("https://www.importgenius.com/search", "q", params),
    default_country: "USA",
    score: 70,
    cards: &[".company-result", ".result-company", "[class*='shipment']"],
    name: NAME,
    country: COUNTRY,
    link: ANY_LINK,
    website: &[],
    extras: &[Extra {
        key: "shipments",
        selectors: &["[class*='shipment-count']", "[class*='shipments']"],
        kind: ExtraKind::Text,
    }],
};

static TRADEMO: DirectoryProfile = DirectoryProfile {
    id: "trademo",
    label: "Trademo Intel",
    aliases: &["trademo intel"],
    kind: SourceKind::TradeDatabase,
    base: "https://trademo.com",
    requires_proxy: true,
    build_url: |params| keyword_url("https://trademo.com/search", "q", params),
    default_country: "Global",
    score: 70,
    cards: &[".company-card", ".result-item", "[class*='Company']", "[class*='buyer']"],
    name: NAME,
    country: COUNTRY,
    link: ANY_LINK,
    website: &[],
    extras: &[],
};

static PANJIVA: DirectoryProfile = DirectoryProfile {
    id: "panjiva",
    label: "Panjiva",
    aliases: &[],
    kind: SourceKind::TradeDatabase,
    base: "https://panjiva.com",
    requires_proxy: true,
    build_url: |params| keyword_url("https://panjiva.com/search", "q", params),
    default_country: "USA",
    score: 70,
    cards: &[".entity-card", "[class*='CompanyCard']", "[class*='entity']"],
    name: NAME,
    country: COUNTRY,
    link: ANY_LINK,
    website: &[],
    extras: &[],
};

static GLOBAL_BUYERS: DirectoryProfile = DirectoryProfile {
    id: "global_buyers",
    label: "Global Buyers Online",
    aliases: &["global buyers online", "globalbuyers"],
    kind: SourceKind::TradeDatabase,
    base: "https://www.globalbuyers.online",
    requires_proxy: false,
    build_url: |params| keyword_url("https://www.globalbuyers.online/search", "keyword", params),
    default_country: "Global",
    score: 65,
    cards: &[".buyer-card", ".company-item", "[class*='buyer']"],
    name: NAME,
    country: COUNTRY,
    link: ANY_LINK,
    website: &[],
    extras: &[],
};

static EUROPAGES: DirectoryProfile = DirectoryProfile {
    id: "europages",
    label: "Europages",
    aliases: &[],
    kind: SourceKind::Marketplace,
    base: "https://www.europages.com.tr",
    requires_proxy: false,
    build_url: |params| {
        let region = match params.country_code() {
            "" => "DE".to_string(),
            code => code.to_ascii_uppercase(),
        };
        Ok(SearchUrl::parse("https://www.europages.com.tr/firma/")?
            .segment(&format!("{}.html", params.query()))
            .query("countryCode", &region)
            .build())
    },
    default_country: "Europe",
    score: 68,
    cards: &[".company-card", "[class*='CompanyCard']", ".ep-company-result"],
    name: &["h2", "h3", "[class*='name']", ".company-name"],
    country: &["[class*='country']", ".country", ".location"],
    link: ANY_LINK,
    website: &["a[class*='website']", "a[href*='website']"],
    extras: &[],
};

static KOMPASS: DirectoryProfile = DirectoryProfile {
    id: "kompass",
    label: "Kompass",
    aliases: &[],
    kind: SourceKind::Marketplace,
    base: "https://www.kompass.com",
    requires_proxy: false,
    build_url: |params| {
        keyword_url("https://www.kompass.com/selectcountry/en/search", "text", params)
    },
    default_country: "Global",
    score: 68,
    cards: &[".company-item", ".prod_list", "[class*='company-card']", "[class*='result']"],
    name: &[".company-name", "h2", "h3", "[class*='name']"],
    country: &[".location", "[class*='country']", "[class*='address']"],
    link: ANY_LINK,
    website: &["a[class*='website']", "a[rel~='nofollow'][href^='http']"],
    extras: &[Extra {
        key: "activity",
        selectors: &[".activity", "[class*='activit']"],
        kind: ExtraKind::Text,
    }],
};

static THOMASNET: DirectoryProfile = DirectoryProfile {
    id: "thomasnet",
    label: "Thomasnet",
    aliases: &["thomas net"],
    kind: SourceKind::Marketplace,
    base: "https://www.thomasnet.com",
    requires_proxy: false,
    build_url: |params| {
        Ok(SearchUrl::parse("https://www.thomasnet.com/search")?
            .segment(&params.query())
            .build())
    },
    default_country: "USA",
    score: 66,
    cards: &[".supplier-search-result", "[data-testid='supplier-card']", "[class*='supplier']"],
    name: &["h2", "h3", "[class*='name']"],
    country: &["[class*='location']", "[class*='country']"],
    link: ANY_LINK,
    website: &["a[class*='website']", "a[data-testid='website-link']"],
    extras: &[Extra {
        key: "certifications",
        selectors: &["[class*='certification'] li", "[class*='certification']"],
        kind: ExtraKind::List,
    }],
};

static ALIBABA: DirectoryProfile = DirectoryProfile {
    id: "alibaba",
    label: "Alibaba",
    aliases: &["alibaba.com"],
    kind: SourceKind::Marketplace,
    base: "https://www.alibaba.com",
    requires_proxy: false,
    build_url: |params| keyword_url("https://www.alibaba.com/trade/search", "SearchText", params),
    default_country: "China",
    score: 62,
    cards: &[".organic-list-offer", ".list-no-v2-outter", "[class*='offer-card']", "[class*='product-card']"],
    name: &["[class*='company-name']", "[class*='supplier']", "h2", "h3"],
    country: &["[class*='country']", "[class*='location']"],
    link: &["a[href*='company']", "a[href]"],
    website: &[],
    extras: &[
        Extra {
            key: "price",
            selectors: &["[class*='price']"],
            kind: ExtraKind::Text,
        },
        Extra {
            key: "minOrder",
            selectors: &["[class*='moq']", "[class*='min-order']", "[class*='minOrder']"],
            kind: ExtraKind::Text,
        },
    ],
};

/// Registration order is the listing order.
pub(super) fn all() -> Vec<DirectoryAdapter> {
    [
        &TRADEATLAS,
        &IMPORTGENIUS,
        &TRADEMO,
        &PANJIVA,
        &GLOBAL_BUYERS,
        &EUROPAGES,
        &KOMPASS,
        &THOMASNET,
        &ALIBABA,
    ]
    .into_iter()
    .map(|profile| DirectoryAdapter { profile })
    .collect()
}

/// One card-listing source, driven by a static profile.
#[derive(Clone, Copy)]
pub struct DirectoryAdapter {
    profile: &'static DirectoryProfile,
}

impl std::fmt::Debug for DirectoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DirectoryAdapter")
            .field(&self.profile.id)
            .finish()
    }
}

#[async_trait]
impl SourceAdapter for DirectoryAdapter {
    fn id(&self) -> &'static str {
        self.profile.id
    }

    fn label(&self) -> &'static str {
        self.profile.label
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.profile.aliases
    }

    fn kind(&self) -> SourceKind {
        self.profile.kind
    }

    fn requires_proxy(&self) -> bool {
        self.profile.requires_proxy
    }

    async fn search(
        &self,
        ctx: &SourceContext,
        params: &SearchParams,
        max_results: usize,
    ) -> Result<Vec<RawResult>, SourceError> {
        let profile = self.profile;
        let url = (profile.build_url)(params)?;
        let query = params.query();
        let country = if params.target_country().is_empty() {
            profile.default_country
        } else {
            params.target_country()
        };

        let page = PageRequest {
            requires_proxy: profile.requires_proxy,
            render_javascript: profile.requires_proxy,
            ..PageRequest::html(profile.id, &url)
        };
        let fallback = Fallback {
            source: profile.id,
            title: format!("{query}: {} search", profile.label),
            country: country.to_string(),
            website: url.clone(),
            product_match: query.clone(),
        };

        Ok(scrape(ctx, &page, &fallback, max_results, |html| {
            parse_cards(profile, html, &url, country, &query)
        })
        .await)
    }
}

fn parse_cards(
    profile: &DirectoryProfile,
    html: &str,
    page_url: &str,
    default_country: &str,
    query: &str,
) -> Vec<Result<RawResult, RecordError>> {
    let doc = Html::parse_document(html);
    let cards = selectors(profile.cards);
    let name = selectors(profile.name);
    let country = selectors(profile.country);
    let link = selectors(profile.link);
    let website = selectors(profile.website);

    select_cards(&doc, &cards)
        .into_iter()
        .map(|card| {
            let company = clean_string(&text_in(card, &name), usize::MAX);
            if company.is_empty() {
                return Err(RecordError::Missing("company name"));
            }

            let card_country = clean_string(&text_in(card, &country), usize::MAX);
            let listing = resolve_link(&href_in(card, &link), profile.base);
            let own_site = resolve_link(&href_in(card, &website), profile.base);
            let target = own_site.or(listing).unwrap_or_else(|| page_url.to_string());
            let contact = extract_email(&text_of(card)).unwrap_or_default();

            let mut result = RawResult::new(profile.id)
                .with_company_name(&company)
                .with_country(if card_country.is_empty() {
                    default_country
                } else {
                    card_country.as_str()
                })
                .with_contact(&contact)
                .with_website(&target)
                .with_product_match(query);
            result.relevance_score = profile.score;

            for extra in profile.extras {
                if let Some(value) = extract_extra(card, extra) {
                    result = result.with_raw(extra.key, value);
                }
            }
            Ok(result)
        })
        .collect()
}

fn extract_extra(card: ElementRef<'_>, extra: &Extra) -> Option<serde_json::Value> {
    let candidates = selectors(extra.selectors);
    match extra.kind {
        ExtraKind::Text => {
            let text = first_match(card, &candidates)
                .map(|node| clean_string(&text_of(node), MAX_EXTRA_LEN))
                .filter(|t| !t.is_empty())?;
            Some(serde_json::Value::String(text))
        }
        ExtraKind::List => {
            let items: Vec<serde_json::Value> = candidates
                .iter()
                .map(|selector| card.select(selector).collect::<Vec<_>>())
                .find(|nodes| !nodes.is_empty())?
                .into_iter()
                .flat_map(|node| {
                    text_of(node)
                        .split(',')
                        .map(|part| clean_string(part, MAX_EXTRA_LEN))
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                })
                .map(serde_json::Value::String)
                .collect();
            (!items.is_empty()).then_some(serde_json::Value::Array(items))
        }
    }
}
