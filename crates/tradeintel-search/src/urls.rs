//! URL normalization, syntactic validation, request-URL building, and text
//! sanitization for everything pulled out of a remote document.

use std::borrow::Cow;

use url::Url;

use crate::error::SourceError;

/// Longest entity name considered when decoding character references.
const MAX_ENTITY_LEN: usize = 12;

/// Resolves `href` to an absolute URL without a fragment.
///
/// - Protocol-relative input (`//host/path`) gets the `https` scheme.
/// - Relative input is resolved against `base` with RFC 3986 reference resolution.
/// - Empty input yields an empty string.
///
/// Input that cannot be made absolute (relative with no usable base, or
/// unparseable) is returned trimmed and otherwise unchanged, so the function
/// is idempotent: `normalize_url(&normalize_url(h, b), b) == normalize_url(h, b)`.
#[must_use]
pub fn normalize_url(href: &str, base: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }

    let candidate: Cow<'_, str> = if href.starts_with("//") {
        Cow::Owned(format!("https:{href}"))
    } else {
        Cow::Borrowed(href)
    };

    if let Ok(mut absolute) = Url::parse(&candidate) {
        absolute.set_fragment(None);
        return absolute.into();
    }

    let base = base.trim();
    if !base.is_empty() {
        if let Ok(mut joined) = Url::parse(base).and_then(|b| b.join(&candidate)) {
            joined.set_fragment(None);
            return joined.into();
        }
    }

    candidate.into_owned()
}

/// Pure syntax check: `http`/`https` scheme and a non-empty host. No I/O.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| {
        matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
    })
}

/// Turns a scraped `href` into a usable absolute link, or `None`.
///
/// Anchors (`#…`) and `javascript:` pseudo-links are rejected outright; the
/// rest is normalized against `base` and kept only if it passes [`is_valid_url`].
#[must_use]
pub fn resolve_link(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
    {
        return None;
    }
    let resolved = normalize_url(href, base);
    is_valid_url(&resolved).then_some(resolved)
}

/// Sanitizes remote text before it is placed into a result.
///
/// Decodes HTML character references, strips control and invisible format
/// characters (newline, tab and space survive), collapses whitespace runs to
/// one space, trims, and truncates to `max_len` characters.
#[must_use]
pub fn clean_string(text: &str, max_len: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let decoded = decode_entities(text);
    let visible: String = decoded
        .chars()
        .filter(|&c| matches!(c, '\n' | '\t' | ' ') || !(c.is_control() || is_format_char(c)))
        .collect();

    let collapsed = visible.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .take(max_len)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Unicode general category `Cf` characters that show up in scraped markup.
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some((ch, consumed)) = decode_reference(tail) {
            out.push(ch);
            rest = &tail[consumed..];
        } else {
            out.push('&');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes one `&name;` / `&#NN;` / `&#xHH;` reference at the start of `tail`.
/// Returns the character and the number of bytes consumed.
fn decode_reference(tail: &str) -> Option<(char, usize)> {
    let semi = 1 + tail[1..]
        .char_indices()
        .take(MAX_ENTITY_LEN)
        .find(|&(_, c)| c == ';')?
        .0;
    let name = &tail[1..semi];

    let ch = if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        char::from_u32(code)?
    } else {
        named_entity(name)?
    };

    Some((ch, semi + 1))
}

fn named_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "laquo" => '«',
        "raquo" => '»',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "cent" => '¢',
        "deg" => '°',
        "middot" => '·',
        "bull" => '•',
        "times" => '×',
        _ => return None,
    };
    Some(ch)
}

/// Builds request URLs from a fixed base plus caller-supplied values.
///
/// All escaping goes through the `url` crate: query values are
/// form-encoded (space becomes `+`) and path segments percent-encoded.
#[derive(Debug, Clone)]
pub struct SearchUrl {
    url: Url,
}

impl SearchUrl {
    /// # Errors
    ///
    /// Returns [`SourceError::Url`] if `base` is not an absolute URL.
    pub fn parse(base: &str) -> Result<Self, SourceError> {
        let url = Url::parse(base).map_err(|e| SourceError::Url {
            base: base.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self { url })
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// Appends the pair only when `value` is non-empty.
    #[must_use]
    pub fn query_opt(self, key: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.query(key, value)
        }
    }

    /// Appends one percent-encoded path segment.
    #[must_use]
    pub fn segment(mut self, value: &str) -> Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments.pop_if_empty().push(value);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.url.into()
    }
}
