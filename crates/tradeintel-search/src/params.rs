//! The search query and the query strings derived from it.

use crate::urls::clean_string;

/// Maximum length kept for each free-text search field.
const MAX_FIELD_LEN: usize = 500;

const DEFAULT_LANGUAGE: &str = "en";

/// Country name (English or Turkish) → two-letter region code.
///
/// Lookup is case-insensitive; unmapped names produce an empty code.
const COUNTRY_CODES: &[(&str, &str)] = &[
    ("germany", "de"),
    ("almanya", "de"),
    ("france", "fr"),
    ("fransa", "fr"),
    ("uk", "gb"),
    ("united kingdom", "gb"),
    ("ingiltere", "gb"),
    ("i̇ngiltere", "gb"),
    ("usa", "us"),
    ("united states", "us"),
    ("abd", "us"),
    ("china", "cn"),
    ("çin", "cn"),
    ("russia", "ru"),
    ("rusya", "ru"),
    ("india", "in"),
    ("hindistan", "in"),
    ("japan", "jp"),
    ("japonya", "jp"),
    ("south korea", "kr"),
    ("güney kore", "kr"),
    ("italy", "it"),
    ("italya", "it"),
    ("i̇talya", "it"),
    ("spain", "es"),
    ("ispanya", "es"),
    ("i̇spanya", "es"),
    ("poland", "pl"),
    ("polonya", "pl"),
    ("brazil", "br"),
    ("brezilya", "br"),
    ("uae", "ae"),
    ("united arab emirates", "ae"),
    ("bae", "ae"),
];

/// Structured search query.
///
/// Every free-text field is sanitized with [`clean_string`] when set, so
/// adapters can splice values into URLs and results without re-cleaning.
/// Immutable once built; share it behind an `Arc` across concurrent adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    product_name: String,
    hs_code: String,
    oem_number: String,
    target_country: String,
    language: String,
    related_sectors: String,
    competitor_brands: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            hs_code: String::new(),
            oem_number: String::new(),
            target_country: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            related_sectors: String::new(),
            competitor_brands: String::new(),
        }
    }
}

impl SearchParams {
    #[must_use]
    pub fn new(product_name: &str) -> Self {
        Self::default().with_product_name(product_name)
    }

    #[must_use]
    pub fn with_product_name(mut self, value: &str) -> Self {
        self.product_name = clean_string(value, MAX_FIELD_LEN);
        self
    }

    /// Tariff classification (HS / GTIP) code, e.g. `8482.10`.
    #[must_use]
    pub fn with_hs_code(mut self, value: &str) -> Self {
        self.hs_code = clean_string(value, MAX_FIELD_LEN);
        self
    }

    /// Manufacturer (OEM) part number.
    #[must_use]
    pub fn with_oem_number(mut self, value: &str) -> Self {
        self.oem_number = clean_string(value, MAX_FIELD_LEN);
        self
    }

    #[must_use]
    pub fn with_target_country(mut self, value: &str) -> Self {
        self.target_country = clean_string(value, MAX_FIELD_LEN);
        self
    }

    /// Blank input keeps the default language (`en`).
    #[must_use]
    pub fn with_language(mut self, value: &str) -> Self {
        let cleaned = clean_string(value, MAX_FIELD_LEN);
        self.language = if cleaned.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            cleaned
        };
        self
    }

    #[must_use]
    pub fn with_related_sectors(mut self, value: &str) -> Self {
        self.related_sectors = clean_string(value, MAX_FIELD_LEN);
        self
    }

    #[must_use]
    pub fn with_competitor_brands(mut self, value: &str) -> Self {
        self.competitor_brands = clean_string(value, MAX_FIELD_LEN);
        self
    }

    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    #[must_use]
    pub fn hs_code(&self) -> &str {
        &self.hs_code
    }

    #[must_use]
    pub fn oem_number(&self) -> &str {
        &self.oem_number
    }

    #[must_use]
    pub fn target_country(&self) -> &str {
        &self.target_country
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn related_sectors(&self) -> &str {
        &self.related_sectors
    }

    #[must_use]
    pub fn competitor_brands(&self) -> &str {
        &self.competitor_brands
    }

    /// `true` when none of the fields that drive a query are set.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.product_name.is_empty() && self.hs_code.is_empty() && self.oem_number.is_empty()
    }

    /// General query: product, `HS <code>`, OEM number, sectors and brands,
    /// space-joined in that order, skipping empty fields.
    #[must_use]
    pub fn query(&self) -> String {
        let hs = if self.hs_code.is_empty() {
            String::new()
        } else {
            format!("HS {}", self.hs_code)
        };
        [
            self.product_name.as_str(),
            hs.as_str(),
            self.oem_number.as_str(),
            self.related_sectors.as_str(),
            self.competitor_brands.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Buyer-intent query: [`query`](Self::query) plus `importer "<country>"`,
    /// or `importer buyer` when no country is set.
    #[must_use]
    pub fn buyer_query(&self) -> String {
        let query = self.query();
        if self.target_country.is_empty() {
            format!("{query} importer buyer")
        } else {
            format!("{query} importer \"{}\"", self.target_country)
        }
    }

    /// Six-digit HS heading: dots and spaces removed, first six digits kept.
    #[must_use]
    pub fn hs6(&self) -> String {
        self.hs_code
            .chars()
            .filter(char::is_ascii_digit)
            .take(6)
            .collect()
    }

    /// Two-letter region code for the target country, or `""` when unmapped.
    #[must_use]
    pub fn country_code(&self) -> &'static str {
        country_code(&self.target_country)
    }
}

/// Looks up the region code for a country name (English or Turkish).
#[must_use]
pub fn country_code(country: &str) -> &'static str {
    let needle = country.trim().to_lowercase();
    if needle.is_empty() {
        return "";
    }
    COUNTRY_CODES
        .iter()
        .find(|(name, _)| *name == needle)
        .map_or("", |(_, code)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_joins_present_fields_in_order() {
        let params = SearchParams::new("ball bearing")
            .with_hs_code("8482.10")
            .with_oem_number("6204-2RS")
            .with_related_sectors("automotive")
            .with_competitor_brands("SKF");
        assert_eq!(
            params.query(),
            "ball bearing HS 8482.10 6204-2RS automotive SKF"
        );
    }

    #[test]
    fn query_skips_empty_fields() {
        let params = SearchParams::default().with_oem_number("6204-2RS");
        assert_eq!(params.query(), "6204-2RS");
    }

    #[test]
    fn buyer_query_appends_intent() {
        let with_country = SearchParams::new("ball bearing").with_target_country("Germany");
        assert_eq!(
            with_country.buyer_query(),
            "ball bearing importer \"Germany\""
        );
        let without = SearchParams::new("ball bearing");
        assert_eq!(without.buyer_query(), "ball bearing importer buyer");
    }

    #[test]
    fn fields_are_cleaned_on_construction() {
        let params = SearchParams::new("  ball\u{200B}   bearing &amp; races ")
            .with_target_country(" Germany\n");
        assert_eq!(params.product_name(), "ball bearing & races");
        assert_eq!(params.target_country(), "Germany");
    }

    #[test]
    fn language_defaults_to_english() {
        assert_eq!(SearchParams::new("x").language(), "en");
        assert_eq!(SearchParams::new("x").with_language("  ").language(), "en");
        assert_eq!(SearchParams::new("x").with_language("tr").language(), "tr");
    }

    #[test]
    fn hs6_strips_separators() {
        let params = SearchParams::new("x").with_hs_code("8482.10.10.00");
        assert_eq!(params.hs6(), "848210");
        assert_eq!(SearchParams::new("x").hs6(), "");
    }

    #[test]
    fn country_code_is_case_insensitive_and_bilingual() {
        assert_eq!(country_code("Germany"), "de");
        assert_eq!(country_code("germany"), "de");
        assert_eq!(country_code("Almanya"), "de");
        assert_eq!(country_code("ABD"), "us");
        assert_eq!(country_code("Güney Kore"), "kr");
        assert_eq!(country_code("Çin"), "cn");
    }

    #[test]
    fn unmapped_country_yields_empty_code() {
        assert_eq!(country_code("Atlantis"), "");
        assert_eq!(country_code(""), "");
        assert_eq!(SearchParams::new("x").country_code(), "");
    }

    #[test]
    fn is_blank_ignores_hint_fields() {
        let hints_only = SearchParams::default()
            .with_target_country("Germany")
            .with_competitor_brands("SKF");
        assert!(hints_only.is_blank());
        assert!(!SearchParams::default().with_hs_code("8482").is_blank());
    }
}
