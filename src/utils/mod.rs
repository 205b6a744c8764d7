//! Common utilities and helper functions
//!
//! This module provides shared text and URL helpers used across the crate.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use url::Url;

/// Letters that keep their mark when diacritics are stripped
const PRESERVED_LETTERS: &[char] = &['ñ', 'Ñ', 'ç', 'Ç'];

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Repair and flatten accented text
///
/// Composes to NFC first so mis-encoded sequences collapse to single code
/// points, then decomposes each character and drops the combining marks.
/// `ñ` and `ç` (upper and lower case) survive untouched.
///
/// # Examples
///
/// ```
/// use portada::utils::normalize_text;
///
/// assert_eq!(normalize_text("Información de la Niñez"), "Informacion de la Niñez");
/// ```
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.nfc() {
        if PRESERVED_LETTERS.contains(&c) {
            out.push(c);
            continue;
        }
        out.extend(std::iter::once(c).nfd().filter(|d| !is_combining_mark(*d)));
    }

    out
}

/// Site identity of a parsed URL: lowercase host without a leading `www.`
pub fn site_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    })
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
