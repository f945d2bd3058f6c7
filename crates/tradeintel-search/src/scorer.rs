//! Relevance scoring.
//!
//! A deliberately simple linear model so a user can see why a result ranks
//! where it does:
//!
//! | Signal | Points |
//! |--------|--------|
//! | base | 50 |
//! | each query token (> 3 chars) found in company name + product match | +8 |
//! | result country equals target country (case-insensitive) | +15 |
//! | contact present | +5 |
//! | website present | +5 |
//!
//! The total is clamped to `[0, 100]`.

use crate::params::SearchParams;
use crate::types::{RawResult, BASE_SCORE};

const TOKEN_POINTS: i64 = 8;
const COUNTRY_POINTS: i64 = 15;
const CONTACT_POINTS: i64 = 5;
const WEBSITE_POINTS: i64 = 5;
const MIN_TOKEN_CHARS: usize = 3;

/// Scores `result` against `params`; always within `0..=100`.
///
/// Query tokens come from [`SearchParams::query`] split on whitespace; a
/// token repeated in the query counts each time it appears. A result with
/// no country matches an unset target country.
#[must_use]
pub fn score(result: &RawResult, params: &SearchParams) -> u8 {
    let haystack = format!("{} {}", result.company_name, result.product_match).to_lowercase();
    let query = params.query().to_lowercase();

    let mut total = i64::from(BASE_SCORE);
    for token in query.split_whitespace() {
        if token.chars().count() > MIN_TOKEN_CHARS && haystack.contains(token) {
            total += TOKEN_POINTS;
        }
    }

    let target = params.target_country();
    if result.country.to_lowercase() == target.to_lowercase() {
        total += COUNTRY_POINTS;
    }
    if !result.contact.is_empty() {
        total += CONTACT_POINTS;
    }
    if !result.website.is_empty() {
        total += WEBSITE_POINTS;
    }

    u8::try_from(total.clamp(0, 100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schaeffler() -> RawResult {
        RawResult::new("google")
            .with_company_name("Schaeffler AG")
            .with_country("Germany")
            .with_website("https://schaeffler.com")
    }

    #[test]
    fn bare_result_scores_base() {
        let params = SearchParams::new("ab").with_target_country("Germany");
        assert_eq!(score(&RawResult::new("x"), &params), 50);
    }

    #[test]
    fn country_and_website_bonuses() {
        let params = SearchParams::new("ball bearing").with_target_country("germany");
        // no token match (company name only), +15 country, +5 website
        assert_eq!(score(&schaeffler(), &params), 70);
    }

    #[test]
    fn token_matches_add_eight_each() {
        let params = SearchParams::new("ball bearing").with_target_country("Germany");
        let result = schaeffler().with_product_match("Ball Bearing supplier");
        assert_eq!(score(&result, &params), 50 + 8 + 8 + 15 + 5);
    }

    #[test]
    fn short_tokens_are_ignored() {
        let params = SearchParams::new("car hub").with_hs_code("8482");
        let result = RawResult::new("x").with_product_match("car hub HS 8482");
        // "car", "hub", "hs" are <= 3 chars; "8482" is 4 chars and matches
        assert_eq!(score(&result, &params), 58);
    }

    #[test]
    fn empty_country_matches_empty_target() {
        let params = SearchParams::new("ab");
        assert_eq!(score(&RawResult::new("x"), &params), 65);
    }

    #[test]
    fn countryless_result_misses_a_set_target() {
        let params = SearchParams::new("xy").with_target_country("Germany");
        let result = RawResult::new("x").with_website("https://a.com");
        assert_eq!(score(&result, &params), 55);
    }

    #[test]
    fn contact_bonus() {
        let params = SearchParams::new("xy").with_target_country("Germany");
        let result = RawResult::new("x").with_contact("sales@example.com");
        assert_eq!(score(&result, &params), 55);
    }

    #[test]
    fn score_is_clamped_to_100() {
        let many = "alpha bravo charlie delta foxtrot hotel india juliet kilo lima";
        let params = SearchParams::new(many).with_target_country("Germany");
        let result = RawResult::new("x")
            .with_company_name(many)
            .with_country("Germany")
            .with_contact("c")
            .with_website("https://a.com");
        assert_eq!(score(&result, &params), 100);
    }

    #[test]
    fn score_never_leaves_bounds() {
        let queries = ["", "a", "bearing bearing bearing bearing bearing bearing bearing"];
        for q in queries {
            let params = SearchParams::new(q).with_target_country("Germany");
            for result in [
                RawResult::new("x"),
                schaeffler().with_product_match(q).with_contact("x"),
            ] {
                let s = score(&result, &params);
                assert!(s <= 100, "score {s} out of range for {q:?}");
            }
        }
    }
}
