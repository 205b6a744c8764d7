//! Title, subtitle and body extraction from article pages
//!
//! Each field is a prioritized selector cascade over the parsed page. The
//! body cascade walks known container types and requires a minimum number
//! of paragraphs before joining the long ones with a blank line.

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::trace;

use super::sanitize::{clean_inline, element_text};
use super::selectors::{BodyContainer, BODY_CONTAINERS, OG_TITLE, PARAGRAPH, SUBTITLE, TITLE};
use crate::config::ValidationConfig;
use crate::utils::error::ExtractError;

/// Result of running the content cascades over one page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    /// Why the content is not usable, if it is not
    pub rejection: Option<ExtractError>,
}

impl ExtractedContent {
    /// Non-empty title and body at least the configured minimum length
    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Extracts article content using the selector tables
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    min_paragraphs: usize,
    min_paragraph_length: usize,
    min_body_length: usize,
}

impl ContentExtractor {
    pub fn new(validation: &ValidationConfig) -> Self {
        Self {
            min_paragraphs: validation.min_paragraphs,
            min_paragraph_length: validation.min_paragraph_length,
            min_body_length: validation.min_body_length,
        }
    }

    /// Extract title, subtitle and body, and judge the result
    ///
    /// Validity is reported, not enforced; the caller decides what to drop.
    pub fn extract(&self, document: &Html) -> ExtractedContent {
        let title = self.extract_title(document);
        let subtitle = self.extract_subtitle(document);
        let body = self.extract_body(document);
        let rejection = self.check(&title, &body).err();

        ExtractedContent {
            title,
            subtitle,
            body,
            rejection,
        }
    }

    /// First non-empty `<h1>`, else `og:title`
    pub fn extract_title(&self, document: &Html) -> String {
        document
            .select(&TITLE)
            .map(|h1| element_text(&h1))
            .find(|text| !text.is_empty())
            .or_else(|| {
                document
                    .select(&OG_TITLE)
                    .filter_map(|meta| meta.value().attr("content"))
                    .map(clean_inline)
                    .find(|text| !text.is_empty())
            })
            .unwrap_or_default()
    }

    /// First non-empty match across the subtitle selectors
    pub fn extract_subtitle(&self, document: &Html) -> Option<String> {
        SUBTITLE.iter().find_map(|selector| {
            document
                .select(selector)
                .next()
                .map(|el| element_text(&el))
                .filter(|text| !text.is_empty())
        })
    }

    /// Body text from the first container type that passes the paragraph gate
    pub fn extract_body(&self, document: &Html) -> String {
        for container in BODY_CONTAINERS.iter() {
            let Some(first) = document.select(&container.selector).next() else {
                continue;
            };

            let paragraphs: Vec<ElementRef<'_>> = first.select(&PARAGRAPH).collect();
            if let Some(body) = self.join_paragraphs(&paragraphs) {
                return body;
            }

            // Some templates split one article across sibling containers
            let siblings = split_containers(document, container);
            if siblings.len() > 1 {
                let mut seen = HashSet::new();
                let paragraphs: Vec<ElementRef<'_>> = siblings
                    .iter()
                    .flat_map(|c| c.select(&PARAGRAPH))
                    .filter(|p| seen.insert(p.id()))
                    .collect();
                if let Some(body) = self.join_paragraphs(&paragraphs) {
                    return body;
                }
            }

            trace!(
                paragraphs = paragraphs.len(),
                "Body container rejected, trying next"
            );
        }

        String::new()
    }

    /// Join paragraphs longer than the minimum, if enough paragraphs exist
    fn join_paragraphs(&self, paragraphs: &[ElementRef<'_>]) -> Option<String> {
        if paragraphs.is_empty() || paragraphs.len() < self.min_paragraphs {
            return None;
        }

        let kept: Vec<String> = paragraphs
            .iter()
            .map(element_text)
            .filter(|text| text.chars().count() > self.min_paragraph_length)
            .collect();

        (!kept.is_empty()).then(|| kept.join("\n\n"))
    }

    fn check(&self, title: &str, body: &str) -> Result<(), ExtractError> {
        if title.is_empty() {
            return Err(ExtractError::TitleNotFound);
        }
        let len = body.chars().count();
        if len < self.min_body_length {
            return Err(ExtractError::BodyTooShort {
                len,
                min: self.min_body_length,
            });
        }
        Ok(())
    }
}

/// Every element of the container's tag whose class contains its fragment
fn split_containers<'a>(document: &'a Html, container: &BodyContainer) -> Vec<ElementRef<'a>> {
    let Some(fragment) = container.class else {
        return Vec::new();
    };
    document
        .select(&container.tag)
        .filter(|el| el.value().classes().any(|class| class.contains(fragment)))
        .collect()
}
