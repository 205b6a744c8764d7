//! CSS selector tables for article pages
//!
//! Ordered lists: the first entry that yields something wins, so
//! site-specific selectors come before generic ones.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// A known article body container
pub struct BodyContainer {
    /// Exact match used for the first lookup
    pub selector: Selector,
    /// Tag used for the multi-container rescan
    pub tag: Selector,
    /// Class fragment for the rescan; `None` disables it
    pub class: Option<&'static str>,
}

impl BodyContainer {
    fn new(tag: &'static str, class: Option<&'static str>) -> Self {
        let css = match class {
            Some(class) => format!("{tag}.{class}"),
            None => tag.to_string(),
        };
        Self {
            selector: Selector::parse(&css).expect("Invalid body container selector"),
            tag: Selector::parse(tag).expect("Invalid body container tag"),
            class,
        }
    }
}

lazy_static! {
    pub static ref TITLE: Selector = parse_selector!("h1");

    pub static ref OG_TITLE: Selector = parse_selector!(r#"meta[property="og:title"]"#);

    pub static ref SUBTITLE: Vec<Selector> = vec![
        parse_selector!("h2"),
        parse_selector!("h3"),
        parse_selector!("p.lead"),
        parse_selector!("div.subtitle"),
    ];

    pub static ref BODY_CONTAINERS: Vec<BodyContainer> = vec![
        BodyContainer::new("div", Some("itemFullText")),
        BodyContainer::new("article", Some("article-body-width")),
        BodyContainer::new("article", Some("article-body")),
        BodyContainer::new("div", Some("entry-content")),
        BodyContainer::new("article", None),
        BodyContainer::new("div", Some("content")),
        BodyContainer::new("div", Some("article-body")),
        BodyContainer::new("div", Some("article-content")),
        BodyContainer::new("div", Some("post-content")),
        BodyContainer::new("div", Some("nota-content")),
    ];

    pub static ref PARAGRAPH: Selector = parse_selector!("p");

    pub static ref JSON_LD: Selector = parse_selector!(r#"script[type="application/ld+json"]"#);

    /// Publication date metadata, most specific first
    pub static ref META_DATE: Vec<Selector> = vec![
        parse_selector!(r#"meta[property="article:published_time"]"#),
        parse_selector!(r#"meta[property="og:published_time"]"#),
        parse_selector!(r#"meta[name="date"]"#),
        parse_selector!(r#"meta[name="pubdate"]"#),
        parse_selector!(r#"meta[name="DC.date.issued"]"#),
        parse_selector!(r#"meta[name="article:published"]"#),
    ];

    pub static ref TIME_DATETIME: Selector = parse_selector!("time[datetime]");

    pub static ref WITH_CLASS: Selector = parse_selector!("[class]");
}

/// Class fragments of elements that usually hold a visible date
pub const DATE_CLASSES: &[&str] = &[
    "itemDateCreated",
    "itemDateModified",
    "entry-date",
    "post-date",
    "td-post-date",
    "jeg_meta_date",
    "date",
    "fecha",
    "published",
    "article-date",
    "news-date",
    "nota-fecha",
];
