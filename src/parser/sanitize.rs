//! Text sanitization for extracted article content
//!
//! Cleans raw DOM text: invisible characters, stray control characters,
//! leftover entities and irregular whitespace.

use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

use crate::utils::{normalize_text, normalize_whitespace};

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid regex pattern"));

static MULTI_NEWLINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex pattern"));

/// Sanitize extracted text content
///
/// 1. Remove zero-width characters
/// 2. Remove control characters (except newline/tab)
/// 3. Decode HTML entities left in the text
/// 4. Collapse runs of spaces and tabs
/// 5. Trim each line
/// 6. Collapse blank lines
///
/// # Examples
///
/// ```
/// use portada::parser::sanitize::sanitize_text;
///
/// let dirty = "Hola\u{200B}Mundo  \n\n\n\nPrueba";
/// assert_eq!(sanitize_text(dirty), "HolaMundo\n\nPrueba");
/// ```
pub fn sanitize_text(text: &str) -> String {
    let mut result = remove_zero_width(text);
    result = remove_control_chars(&result);
    result = html_escape::decode_html_entities(&result).into_owned();
    result = WHITESPACE_REGEX.replace_all(&result, " ").into_owned();
    result = trim_lines(&result);
    result = MULTI_NEWLINE_REGEX.replace_all(&result, "\n\n").into_owned();

    result.trim().to_string()
}

/// Remove zero-width spaces, bidi marks and the byte order mark
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2028}'..='\u{202F}' |
                '\u{2060}' |
                '\u{FEFF}'
            )
        })
        .collect()
}

/// Remove control characters except newline and tab
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Trim whitespace from each line
pub fn trim_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-line text of an element, sanitized and diacritic-normalized
///
/// Text nodes are joined, whitespace is collapsed to single spaces and the
/// result goes through [`normalize_text`].
pub fn element_text(element: &ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    clean_inline(&raw)
}

/// Sanitize, flatten to one line and normalize diacritics
pub fn clean_inline(text: &str) -> String {
    normalize_text(&normalize_whitespace(&sanitize_text(text)))
}
