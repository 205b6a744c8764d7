//! Publication date extraction
//!
//! Dates are read from the first source that yields one, most reliable
//! first: JSON-LD, meta tags, `<time datetime>`, visible Spanish dates in
//! date-like elements and finally date segments of the article URL.
//! Timezone offsets are dropped; the result is naive local time as
//! published.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::trace;

use super::selectors::{DATE_CLASSES, JSON_LD, META_DATE, TIME_DATETIME, WITH_CLASS};
use crate::utils::normalize_whitespace;

/// Plausible publication years
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2020..=2030;

/// Visible date text longer than this is not a date label
const MAX_DATE_TEXT: usize = 100;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

const JSON_LD_KEYS: &[&str] = &["datePublished", "dateCreated", "dateModified"];

static TZ_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]\d{2}:\d{2}$").expect("Invalid regex pattern"));

static TZ_COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(T\d{2}:\d{2}(?::\d{2})?(?:\.\d+)?)[+-]\d{4}$").expect("Invalid regex pattern")
});

static WEEKDAY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(lunes|martes|miércoles|miercoles|jueves|viernes|sábado|sabado|domingo)[,\s]+")
        .expect("Invalid regex pattern")
});

static SPANISH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s+(\w+)\s+(\d{4})(?:\s+(\d{1,2}):(\d{2}))?")
        .expect("Invalid regex pattern")
});

static URL_DATES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/(\d{4})/(\d{2})/(\d{2})/",
        r"/(\d{4})-(\d{2})-(\d{2})[-/]",
        r"-(\d{4})(\d{2})(\d{2})-",
        r"/(\d{4})(\d{2})(\d{2})\d*\.html",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex pattern"))
    .collect()
});

type DateSource = fn(&Html, &str) -> Option<NaiveDateTime>;

const SOURCES: &[(&str, DateSource)] = &[
    ("json_ld", from_json_ld),
    ("meta", from_meta_tags),
    ("time", from_time_element),
    ("date_class", from_date_classes),
    ("url", from_url),
];

/// Publication date cascade
#[derive(Debug, Clone, Copy, Default)]
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First publication date found, or `None`
    pub fn extract(&self, document: &Html, url: &str) -> Option<NaiveDateTime> {
        SOURCES.iter().find_map(|(name, source)| {
            let found = source(document, url);
            if let Some(date) = found {
                trace!(source = name, %date, "Publication date found");
            }
            found
        })
    }
}

fn from_json_ld(document: &Html, _url: &str) -> Option<NaiveDateTime> {
    document.select(&JSON_LD).find_map(|script| {
        let raw: String = script.text().collect();
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        let root = match value {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };

        json_ld_date(&root).or_else(|| {
            root.get("@graph")
                .and_then(Value::as_array)
                .and_then(|graph| graph.iter().find_map(json_ld_date))
        })
    })
}

fn json_ld_date(node: &Value) -> Option<NaiveDateTime> {
    let raw = JSON_LD_KEYS
        .iter()
        .find_map(|key| node.get(*key).and_then(Value::as_str))?;
    parse_iso_date(raw)
}

fn from_meta_tags(document: &Html, _url: &str) -> Option<NaiveDateTime> {
    META_DATE.iter().find_map(|selector| {
        document
            .select(selector)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .and_then(parse_iso_date)
    })
}

fn from_time_element(document: &Html, _url: &str) -> Option<NaiveDateTime> {
    document
        .select(&TIME_DATETIME)
        .filter_map(|time| time.value().attr("datetime"))
        .find_map(parse_iso_date)
}

fn from_date_classes(document: &Html, _url: &str) -> Option<NaiveDateTime> {
    DATE_CLASSES.iter().find_map(|fragment| {
        let fragment = fragment.to_lowercase();
        document
            .select(&WITH_CLASS)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| class.to_lowercase().contains(&fragment))
            })
            .find_map(|el| {
                let text = normalize_whitespace(&el.text().collect::<String>());
                if text.is_empty() || text.chars().count() >= MAX_DATE_TEXT {
                    return None;
                }
                parse_spanish_date(&text)
            })
    })
}

fn from_url(_document: &Html, url: &str) -> Option<NaiveDateTime> {
    URL_DATES.iter().find_map(|pattern| {
        let caps = pattern.captures(url)?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if !YEAR_RANGE.contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
    })
}

/// Parse an ISO-8601-like or common numeric date string
///
/// Offsets (`-03:00`, `-0300`, `Z`) are discarded, not applied. Date-only
/// inputs resolve to midnight.
///
/// # Examples
///
/// ```
/// use portada::parser::date::parse_iso_date;
///
/// let date = parse_iso_date("2025-03-01T10:00:00-03:00").unwrap();
/// assert_eq!(date.to_string(), "2025-03-01 10:00:00");
/// ```
pub fn parse_iso_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_offset = TZ_OFFSET.replace(trimmed, "");
    let without_offset = TZ_COMPACT.replace(&without_offset, "$1");
    let cleaned = without_offset.replace('Z', "").replace(".000", "");
    let cleaned = cleaned.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parse a visible Spanish date such as `Lunes, 28 de diciembre de 2025 - 11:43`
///
/// Weekday prefixes are ignored and `setiembre` is accepted. Years outside
/// 2020-2030 are rejected.
pub fn parse_spanish_date(text: &str) -> Option<NaiveDateTime> {
    let lower = text.trim().to_lowercase();
    let lower = WEEKDAY_PREFIX.replace(&lower, "");
    let flattened = lower
        .replace(" de ", " ")
        .replace(" - ", " ")
        .replace(',', " ");
    let flattened = normalize_whitespace(&flattened);

    let caps = SPANISH_DATE.captures(&flattened)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    if !YEAR_RANGE.contains(&year) {
        return None;
    }

    let (hour, minute) = match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => (h.as_str().parse().ok()?, m.as_str().parse().ok()?),
        _ => (0, 0),
    };

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}
