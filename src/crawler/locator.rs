//! Front page article discovery
//!
//! [`ArticleLocator`] finds the elements of a front page that wrap one
//! article teaser each. It runs an ordered table of strategies:
//!
//! 1. every `<article>` element
//! 2. every element matching a `(tag, class fragment)` pair
//! 3. the nearest `article`/`div`/`li` ancestor of links whose href looks
//!    like an article URL
//!
//! Stages 1 and 2 always run and are unioned. Stage 3 only runs while the
//! union is below the minimum. Candidates are deduplicated by node identity.
//! If the final count is still below the minimum the page is not treated as
//! a front page and the result is empty.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::{DiscoveryConfig, ValidationConfig};

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    static ref ARTICLE: Selector = parse_selector!("article");
    static ref LINK: Selector = parse_selector!("a[href]");
}

/// A DOM element believed to wrap one article teaser
///
/// Borrowed from the parsed front page; it never outlives that document.
pub type ArticleCandidate<'a> = ElementRef<'a>;

/// Tag selector paired with the class fragment it must contain
#[derive(Debug)]
struct ClassRule {
    tag: Selector,
    fragment: String,
}

type Strategy = for<'a> fn(&ArticleLocator, &'a Html) -> Vec<ElementRef<'a>>;

struct Stage {
    name: &'static str,
    run: Strategy,
    /// Run even when the minimum is already met
    always: bool,
}

const STAGES: &[Stage] = &[
    Stage {
        name: "semantic_article",
        run: ArticleLocator::semantic_articles,
        always: true,
    },
    Stage {
        name: "tag_class",
        run: ArticleLocator::tag_class_matches,
        always: true,
    },
    Stage {
        name: "link_pattern",
        run: ArticleLocator::link_pattern_containers,
        always: false,
    },
];

/// Locates article teaser containers on a front page
#[derive(Debug)]
pub struct ArticleLocator {
    rules: Vec<ClassRule>,
    url_patterns: Vec<String>,
    min_articles: usize,
}

impl ArticleLocator {
    pub fn new(discovery: &DiscoveryConfig, validation: &ValidationConfig) -> Self {
        let rules = discovery
            .article_selectors
            .iter()
            .filter_map(|rule| match Selector::parse(&rule.tag) {
                Ok(tag) => Some(ClassRule {
                    tag,
                    fragment: rule.class.clone(),
                }),
                Err(_) => {
                    warn!(tag = %rule.tag, "Ignoring article selector with invalid tag");
                    None
                }
            })
            .collect();

        Self {
            rules,
            url_patterns: discovery
                .url_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            min_articles: validation.min_articles_found,
        }
    }

    /// Find the article candidates of a front page
    ///
    /// Never fails; an empty result means the page did not look like a
    /// front page.
    pub fn locate<'a>(&self, document: &'a Html) -> Vec<ArticleCandidate<'a>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for stage in STAGES {
            if !stage.always && found.len() >= self.min_articles {
                continue;
            }

            let before = found.len();
            for element in (stage.run)(self, document) {
                if seen.insert(element.id()) {
                    found.push(element);
                }
            }

            debug!(
                stage = stage.name,
                added = found.len() - before,
                total = found.len(),
                "Locator stage finished"
            );
        }

        if found.len() >= self.min_articles {
            found
        } else {
            debug!(
                found = found.len(),
                min = self.min_articles,
                "Not enough article candidates"
            );
            Vec::new()
        }
    }

    /// Minimum number of candidates for a page to count as a front page
    pub fn min_articles(&self) -> usize {
        self.min_articles
    }

    fn semantic_articles<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&ARTICLE).collect()
    }

    fn tag_class_matches<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let mut matches = Vec::new();
        for rule in &self.rules {
            matches.extend(document.select(&rule.tag).filter(|element| {
                element
                    .value()
                    .classes()
                    .any(|class| class.contains(rule.fragment.as_str()))
            }));
        }
        matches
    }

    fn link_pattern_containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&LINK)
            .filter(|link| {
                let href = link.value().attr("href").unwrap_or("").to_lowercase();
                self.url_patterns.iter().any(|p| href.contains(p.as_str()))
            })
            .filter_map(|link| {
                link.ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|el| matches!(el.value().name(), "article" | "div" | "li"))
            })
            .collect()
    }
}
