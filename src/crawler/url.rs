//! Article URL resolution and validation
//!
//! Turns located teaser containers into a deduplicated, insertion-ordered
//! list of absolute article URLs on the same site as the front page.

use lazy_static::lazy_static;
use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use tracing::trace;
use url::Url;

use crate::config::ValidationConfig;
use crate::crawler::locator::ArticleCandidate;

lazy_static! {
    static ref LINK: Selector = Selector::parse("a[href]").expect("Invalid CSS selector: a[href]");
}

/// Resolves candidate containers to article URLs
#[derive(Debug, Clone)]
pub struct UrlResolver {
    min_path_length: usize,
}

impl UrlResolver {
    pub fn new(validation: &ValidationConfig) -> Self {
        Self {
            min_path_length: validation.min_path_length,
        }
    }

    /// Resolve, validate and deduplicate the article URLs of `candidates`
    ///
    /// Every link inside a candidate is considered. A candidate without
    /// links is probed through its parent (when that parent is itself a
    /// link) and then its next and previous sibling elements.
    pub fn resolve(&self, candidates: &[ArticleCandidate<'_>], base_url: &Url) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for candidate in candidates {
            for href in candidate_links(candidate) {
                match self.resolve_href(href, base_url) {
                    Some(url) => {
                        let url = url.to_string();
                        if seen.insert(url.clone()) {
                            urls.push(url);
                        }
                    }
                    None => trace!(href = %href, "Rejected link"),
                }
            }
        }

        urls
    }

    /// Resolve one raw href against the front page URL
    ///
    /// Returns `None` when the link is a template placeholder, leaves the
    /// site, points at boilerplate or is too short to be an article.
    pub fn resolve_href(&self, href: &str, base_url: &Url) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || validators::has_template_marker(href) {
            return None;
        }

        let mut url = base_url.join(href).ok()?;
        if !matches!(url.scheme(), "http" | "https")
            || validators::has_template_marker(url.as_str())
        {
            return None;
        }
        url.set_fragment(None);

        if !validators::is_same_site(&url, base_url)
            || validators::is_excluded(&url)
            || !validators::is_article_path(url.path(), self.min_path_length)
        {
            return None;
        }

        Some(url)
    }
}

/// Raw hrefs for one candidate, with parent and sibling probing
fn candidate_links<'a>(candidate: &ElementRef<'a>) -> Vec<&'a str> {
    let inner: Vec<&'a str> = candidate
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .collect();
    if !inner.is_empty() {
        return inner;
    }

    // Parent wrapping the teaser
    if let Some(href) = candidate
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|parent| parent.value().name() == "a")
        .and_then(|parent| parent.value().attr("href"))
    {
        return vec![href];
    }

    let next = candidate.next_siblings().find_map(ElementRef::wrap);
    let prev = candidate.prev_siblings().find_map(ElementRef::wrap);

    [next, prev]
        .into_iter()
        .flatten()
        .find_map(first_link)
        .into_iter()
        .collect()
}

fn first_link<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    if element.value().name() == "a" {
        if let Some(href) = element.value().attr("href") {
            return Some(href);
        }
    }
    element
        .select(&LINK)
        .find_map(|a| a.value().attr("href"))
}

pub mod validators {
    use lazy_static::lazy_static;
    use regex::Regex;
    use url::Url;

    use crate::utils::site_host;

    /// Path segments that never lead to an article
    const EXCLUDED_SEGMENTS: &[&str] = &[
        "category",
        "categoria",
        "categorias",
        "tag",
        "tags",
        "etiqueta",
        "etiquetas",
        "author",
        "autor",
        "autores",
        "page",
        "pagina",
        "wp-admin",
        "wp-login.php",
        "wp-json",
        "admin",
        "login",
        "feed",
        "rss",
        "search",
        "buscar",
        "busqueda",
        "contacto",
        "contact",
        "privacidad",
        "privacy",
        "terminos",
        "terminos-y-condiciones",
        "terms",
        "legales",
        "aviso-legal",
        "cookies",
        "suscripcion",
        "newsletter",
    ];

    lazy_static! {
        /// `/2025`, `/2025/12`, `/2025/12/20/`
        static ref DATE_ONLY_PATH: Regex =
            Regex::new(r"^/\d{4}(/\d{1,2}){0,2}/?$").expect("Invalid regex pattern");
        static ref NON_DOCUMENT: Regex =
            Regex::new(r"(?i)\.(jpe?g|png|gif|webp|svg|pdf|xml|mp3|mp4|zip|css|js)$")
                .expect("Invalid regex pattern");
    }

    /// Unresolved template placeholder such as `{{ url }}`
    pub fn has_template_marker(href: &str) -> bool {
        let lower = href.to_ascii_lowercase();
        lower.contains("{{") || lower.contains("%7b%7b")
    }

    /// Same registrable site, ignoring case and a leading `www.`
    pub fn is_same_site(url: &Url, base: &Url) -> bool {
        match (site_host(url), site_host(base)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Boilerplate, listing, feed, search, date-only or non-document URL
    pub fn is_excluded(url: &Url) -> bool {
        let path = url.path().to_lowercase();

        if DATE_ONLY_PATH.is_match(&path) || NON_DOCUMENT.is_match(&path) {
            return true;
        }

        if path
            .split('/')
            .any(|segment| EXCLUDED_SEGMENTS.contains(&segment))
        {
            return true;
        }

        url.query_pairs().any(|(key, _)| key == "s")
    }

    /// Not the site root and long enough to hold a slug
    pub fn is_article_path(path: &str, min_len: usize) -> bool {
        let trimmed = path.trim_end_matches('/');
        !trimmed.is_empty() && path.len() >= min_len
    }
}
