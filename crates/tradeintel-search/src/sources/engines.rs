//! General web search engines.
//!
//! All engines share one result-card parser; each engine only contributes
//! its request URL, selector preferences and redirect-wrapper format.

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{
    first_match, href_in, scrape, select_cards, selectors, text_in, text_of, Fallback,
    PageRequest, SourceAdapter, SourceContext, SourceKind,
};
use crate::error::{RecordError, SourceError};
use crate::params::SearchParams;
use crate::types::RawResult;
use crate::urls::{clean_string, is_valid_url, resolve_link, SearchUrl};

const MAX_DESCRIPTION_LEN: usize = 300;

/// How an engine wraps outbound links.
#[derive(Debug, Clone, Copy)]
enum Redirect {
    None,
    /// `<base><path_prefix>...?<param>=<target>`
    QueryParam {
        path_prefix: &'static str,
        param: &'static str,
    },
    /// Yahoo's `/RU=<encoded target>/RK=...` path segment.
    YahooRu,
}

/// Region hint passed to the proxy, and the country stamped on results.
#[derive(Debug, Clone, Copy)]
enum Locale {
    /// Derived from the query's target country.
    Target,
    /// Pinned to one region, e.g. Baidu → `cn` / "China".
    Fixed {
        region: &'static str,
        country: &'static str,
    },
}

struct EngineProfile {
    id: &'static str,
    label: &'static str,
    aliases: &'static [&'static str],
    base: &'static str,
    requires_proxy: bool,
    locale: Locale,
    build_url: fn(&SearchParams) -> Result<String, SourceError>,
    cards: &'static [&'static str],
    title: &'static [&'static str],
    link: &'static [&'static str],
    snippet: &'static [&'static str],
    redirect: Redirect,
}

const GOOGLE_STYLE_CARDS: &[&str] = &[".g", ".tF2Cxc", "[data-sokoban-container]", ".result"];
const GOOGLE_STYLE_TITLE: &[&str] = &["h3", "h2", ".title"];
const GOOGLE_STYLE_SNIPPET: &[&str] = &[".VwiC3b", ".st", "[class*='snippet']", ".abstract", "p"];
const ANY_LINK: &[&str] = &["a[href]"];

static GOOGLE: EngineProfile = EngineProfile {
    id: "google",
    label: "Google",
    aliases: &[],
    base: "https://www.google.com",
    requires_proxy: true,
    locale: Locale::Target,
    build_url: |params| {
        Ok(SearchUrl::parse("https://www.google.com/search")?
            .query("q", &params.buyer_query())
            .query("num", "20")
            .query_opt("gl", params.country_code())
            .query("hl", "en")
            .build())
    },
    cards: GOOGLE_STYLE_CARDS,
    title: GOOGLE_STYLE_TITLE,
    link: ANY_LINK,
    snippet: GOOGLE_STYLE_SNIPPET,
    redirect: Redirect::QueryParam {
        path_prefix: "/url",
        param: "q",
    },
};

static BING: EngineProfile = EngineProfile {
    id: "bing",
    label: "Bing",
    aliases: &[],
    base: "https://www.bing.com",
    requires_proxy: true,
    locale: Locale::Target,
    build_url: |params| {
        Ok(SearchUrl::parse("https://www.bing.com/search")?
            .query("q", &params.buyer_query())
            .query_opt("cc", params.country_code())
            .build())
    },
    cards: &["li.b_algo", ".g", ".result"],
    title: &["h2", "h3", ".title"],
    link: &["h2 a[href]", "a[href]"],
    snippet: &[".b_caption p", "[class*='snippet']", "p"],
    redirect: Redirect::None,
};

static YAHOO: EngineProfile = EngineProfile {
    id: "yahoo",
    label: "Yahoo",
    aliases: &[],
    base: "https://search.yahoo.com",
    requires_proxy: true,
    locale: Locale::Target,
    build_url: |params| {
        Ok(SearchUrl::parse("https://search.yahoo.com/search")?
            .query("p", &params.buyer_query())
            .build())
    },
    cards: &["div.algo", ".g", ".result"],
    title: &["h3", "h2", ".title"],
    link: &["h3 a[href]", "a[href]"],
    snippet: &[".compText", "[class*='snippet']", "p"],
    redirect: Redirect::YahooRu,
};

static YANDEX: EngineProfile = EngineProfile {
    id: "yandex",
    label: "Yandex",
    aliases: &[],
    base: "https://www.yandex.com",
    requires_proxy: true,
    locale: Locale::Target,
    build_url: |params| {
        Ok(SearchUrl::parse("https://www.yandex.com/search/")?
            .query("text", &params.buyer_query())
            .query("lr", "225")
            .build())
    },
    cards: &[".serp-item", ".organic", "[class*='OrganicTitle']"],
    title: &["h2", ".organic__title", "[class*='Title']"],
    link: ANY_LINK,
    snippet: &[".organic__content-wrapper", ".text-container"],
    redirect: Redirect::None,
};

static BAIDU: EngineProfile = EngineProfile {
    id: "baidu",
    label: "Baidu",
    aliases: &[],
    base: "https://www.baidu.com",
    requires_proxy: true,
    locale: Locale::Fixed {
        region: "cn",
        country: "China",
    },
    build_url: |params| {
        Ok(SearchUrl::parse("https://www.baidu.com/s")?
            .query("wd", &params.buyer_query())
            .build())
    },
    cards: &[".result", ".c-container", "[class*='result_']"],
    title: &["h3", ".t", "[class*='title']"],
    link: ANY_LINK,
    snippet: &[".c-abstract", ".c-span-last", "p"],
    redirect: Redirect::None,
};

static DUCKDUCKGO: EngineProfile = EngineProfile {
    id: "duckduckgo",
    label: "DuckDuckGo",
    aliases: &["duck duck go", "ddg"],
    base: "https://duckduckgo.com",
    requires_proxy: false,
    locale: Locale::Target,
    build_url: |params| {
        Ok(SearchUrl::parse("https://html.duckduckgo.com/html/")?
            .query("q", &params.buyer_query())
            .build())
    },
    cards: &[".result", ".web-result"],
    title: &["a.result__a", "h2"],
    link: &["a.result__a", "a[href]"],
    snippet: &[".result__snippet", ".result__body"],
    redirect: Redirect::QueryParam {
        path_prefix: "/l/",
        param: "uddg",
    },
};

/// Registration order is the listing order.
pub(super) fn all() -> Vec<SearchEngine> {
    [&GOOGLE, &BING, &YAHOO, &YANDEX, &BAIDU, &DUCKDUCKGO]
        .into_iter()
        .map(|profile| SearchEngine { profile })
        .collect()
}

/// One search engine, driven by a static profile.
#[derive(Clone, Copy)]
pub struct SearchEngine {
    profile: &'static EngineProfile,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SearchEngine").field(&self.profile.id).finish()
    }
}

impl SearchEngine {
    fn region<'p>(&self, params: &'p SearchParams) -> &'p str {
        match self.profile.locale {
            Locale::Target => params.country_code(),
            Locale::Fixed { region, .. } => region,
        }
    }

    fn result_country(&self, params: &SearchParams) -> String {
        match self.profile.locale {
            Locale::Target => params.target_country().to_string(),
            Locale::Fixed { country, .. } => country.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for SearchEngine {
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
        SourceKind::SearchEngine
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
        let query = params.buyer_query();
        let country = self.result_country(params);

        let page = PageRequest {
            requires_proxy: profile.requires_proxy,
            render_javascript: profile.requires_proxy,
            region: self.region(params),
            ..PageRequest::html(profile.id, &url)
        };
        let fallback = Fallback {
            source: profile.id,
            title: format!("{query}: {} search", profile.label),
            country: if country.is_empty() {
                "Global".to_string()
            } else {
                country.clone()
            },
            website: url.clone(),
            product_match: params.product_name().to_string(),
        };

        Ok(scrape(ctx, &page, &fallback, max_results, |html| {
            parse_cards(profile, html, &url, &country, params.product_name(), max_results)
        })
        .await)
    }
}

/// Maps every result card on an engine page to a record.
fn parse_cards(
    profile: &EngineProfile,
    html: &str,
    page_url: &str,
    country: &str,
    product_match: &str,
    max_results: usize,
) -> Vec<Result<RawResult, RecordError>> {
    let doc = Html::parse_document(html);
    let cards = selectors(profile.cards);
    let title = selectors(profile.title);
    let link = selectors(profile.link);
    let snippet = selectors(profile.snippet);

    select_cards(&doc, &cards)
        .into_iter()
        .take(max_results.saturating_mul(2))
        .map(|card| {
            let title_text = first_match(card, &title)
                .map(text_of)
                .map(|t| clean_string(&t, usize::MAX))
                .filter(|t| !t.is_empty())
                .ok_or(RecordError::Missing("title"))?;
            let href = href_in(card, &link);
            if href.is_empty() {
                return Err(RecordError::Missing("link"));
            }
            let website = resolve_link(&href, profile.base)
                .or_else(|| resolve_link(&href, page_url))
                .map(|resolved| unwrap_redirect(&resolved, profile.redirect))
                .filter(|target| is_valid_url(target))
                .ok_or_else(|| RecordError::BadLink(href.clone()))?;

            let description = clean_string(&text_in(card, &snippet), MAX_DESCRIPTION_LEN);
            let contact = super::extract_email(&description).unwrap_or_default();

            Ok(RawResult::new(profile.id)
                .with_company_name(&title_text)
                .with_country(country)
                .with_contact(&contact)
                .with_website(&website)
                .with_product_match(product_match)
                .with_raw("description", description))
        })
        .collect()
}

/// Replaces an engine redirect wrapper with the link it points to.
/// Links that are not wrapped are returned unchanged.
fn unwrap_redirect(link: &str, redirect: Redirect) -> String {
    let unwrapped = match redirect {
        Redirect::None => None,
        Redirect::QueryParam { path_prefix, param } => Url::parse(link).ok().and_then(|url| {
            if !url.path().starts_with(path_prefix) {
                return None;
            }
            url.query_pairs()
                .find(|(key, _)| key == param)
                .map(|(_, value)| value.into_owned())
        }),
        Redirect::YahooRu => link.find("/RU=").and_then(|start| {
            let rest = &link[start + 4..];
            let encoded = rest.split("/R").next().unwrap_or(rest);
            url::form_urlencoded::parse(format!("u={encoded}").as_bytes())
                .next()
                .map(|(_, value)| value.into_owned())
        }),
    };
    unwrapped
        .filter(|target| is_valid_url(target))
        .unwrap_or_else(|| link.to_string())
}
