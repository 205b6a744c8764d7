//! Configuration management for the portada harvester
//!
//! Every component receives its own section of [`Config`] at construction
//! time. The value is loaded once, from a TOML file or from `PORTADA_*`
//! environment variables layered over the defaults, and never mutated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::models::Source;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Network behaviour
    pub crawler: CrawlerConfig,

    /// Acceptance thresholds for discovery and extraction
    pub validation: ValidationConfig,

    /// Front page discovery tables
    pub discovery: DiscoveryConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Relevance classification
    pub classifier: ClassifierConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Ordered list of sites to crawl
    pub sources: Vec<Source>,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of in-flight fetches across the whole run
    pub max_concurrent_requests: usize,

    /// Maximum number of in-flight fetches against one host
    pub limit_per_host: usize,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string; empty picks one from a built-in pool per request
    pub user_agent: String,

    /// Requests per second across the run, 0 disables the limiter
    pub rate_limit: u32,

    /// Extra attempts for transient fetch failures, 0 fails fast
    pub max_retries: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 15,
            limit_per_host: 5,
            request_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit: 0,
            max_retries: 0,
        }
    }
}

/// Browser user agent sent by default
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Thresholds; larger values mean stricter acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum body length in characters
    pub min_body_length: usize,

    /// Minimum number of candidates for a page to count as a front page
    pub min_articles_found: usize,

    /// Minimum number of paragraphs inside a body container
    pub min_paragraphs: usize,

    /// Paragraphs must be strictly longer than this to be kept
    pub min_paragraph_length: usize,

    /// Minimum URL path length for an article link
    pub min_path_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_body_length: 100,
            min_articles_found: 3,
            min_paragraphs: 2,
            min_paragraph_length: 20,
            min_path_length: 10,
        }
    }
}

/// `(tag, class fragment)` pair for teaser containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSelector {
    pub tag: String,
    pub class: String,
}

impl ArticleSelector {
    pub fn new(tag: &str, class: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class: class.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Container selectors, site-specific ones first
    pub article_selectors: Vec<ArticleSelector>,

    /// Substrings that mark a link as pointing to an article
    pub url_patterns: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let article_selectors = [
            ("article", "news-article"),
            ("article", "article-badge-in-image"),
            ("div", "gkNewsElement"),
            ("div", "nspArt"),
            ("article", "wp-block-post"),
            ("div", "post-item"),
            ("article", "entry-box"),
            ("article", "card"),
            ("article", "article"),
            ("article", "post"),
            ("div", "article"),
            ("div", "news-item"),
        ]
        .iter()
        .map(|(tag, class)| ArticleSelector::new(tag, class))
        .collect();

        let url_patterns = [
            "/noticia",
            "/nota",
            "/post",
            "/articulo",
            "/news",
            "202",
            "/prensa",
            "/gobierno",
            "-n1",
            "-n2",
            "-n3",
            "-n4",
            "-n5",
            "/deportes",
            "/economia",
            "/salud",
            "/policiales",
            "/san-juan",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            article_selectors,
            url_patterns,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/noticias.db"),
        }
    }
}

/// Relevance classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Run the remote classifier after the keyword pre-filter
    pub enabled: bool,

    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,

    /// Bearer token for the endpoint
    pub api_key: Option<String>,

    pub model: String,

    /// Minimum score for a relevant verdict to be kept
    pub relevance_threshold: f64,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Criteria handed to the classifier
    pub context_prompt: String,

    /// Lowercase keywords for the pre-filter; empty keeps everything
    pub keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::from("https://api.groq.com/openai/v1/chat/completions"),
            api_key: None,
            model: String::from("llama-3.3-70b-versatile"),
            relevance_threshold: 0.6,
            timeout_secs: 30,
            context_prompt: DEFAULT_CONTEXT_PROMPT.trim().to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const DEFAULT_CONTEXT_PROMPT: &str = r#"
Estoy buscando noticias relacionadas con la Municipalidad de la Ciudad de San Juan, Argentina.

Son relevantes las noticias sobre:
- La intendenta Susana Laciar y su gestión
- Acciones, obras o anuncios del gobierno municipal de la Ciudad de San Juan
- Servicios municipales: recolección de residuos, alumbrado, bacheo, espacios verdes
- El Concejo Deliberante de Capital
- Eventos organizados por la municipalidad
- Problemas urbanos en la ciudad de San Juan (capital)
- Políticas públicas municipales

NO son relevantes:
- Noticias sobre el gobierno provincial de San Juan (gobernador, ministros provinciales)
- Noticias de otros departamentos de San Juan que no sean Capital
- Noticias nacionales o internacionales sin relación directa con la municipalidad
- Deportes, espectáculos o farándula sin relación municipal
- Policiales comunes sin participación municipal
"#;

const DEFAULT_KEYWORDS: &[&str] = &[
    "susana laciar",
    "susana e. laciar",
    "susy laciar",
    "laciar",
    "intendenta de la ciudad de san juan",
    "gestion susana laciar",
    "administracion laciar",
    "equipo de gobierno municipal",
    "municipalidad de la ciudad de san juan",
    "municipalidad de san juan",
    "municipio de san juan",
    "municipio capital",
    "municipalidad capital",
    "gobierno municipal",
    "administracion municipal",
    "concejo deliberante de capital",
    "concejo deliberante de san juan",
    "intendenta de san juan",
    "intendente capital",
    "intendente de san juan",
    "ejecutivo municipal",
    "autoridades municipales",
    "ciudad de san juan",
    "capital sanjuanina",
    "departamento capital",
    "trinidad",
    "desamparados",
    "concepcion",
    "microcentro",
    "plaza 25 de mayo",
    "obras municipales",
    "obra publica municipal",
    "bacheo",
    "alumbrado publico",
    "recoleccion de residuos",
    "limpieza urbana",
    "ordenamiento urbano",
    "espacios verdes",
    "arbolado publico",
    "susy.laciar",
    "@susylaciar",
];

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Front pages of the default deployment
pub fn default_sources() -> Vec<Source> {
    [
        ("Diario de Cuyo", "https://www.diariodecuyo.com.ar/"),
        ("SI San Juan", "https://www.sisanjuan.gob.ar/"),
        ("San Juan 8", "https://www.sanjuan8.com/"),
        ("0264 Noticias", "https://www.0264noticias.com.ar/"),
        ("Nuevo Diario San Juan", "https://www.nuevodiariosanjuan.com.ar/"),
        ("Canal 13 San Juan", "https://www.canal13sanjuan.com/"),
        ("Diario El Zonda", "https://www.diarioelzondasj.com.ar/"),
        ("Telesol Diario", "https://www.telesoldiario.com/"),
        ("Diario Huarpe", "https://www.diariohuarpe.com/"),
        ("Ahora San Juan", "https://www.ahorasanjuan.com/"),
        ("El Sol de San Juan", "https://elsoldesanjuan.com.ar/"),
        ("Diario Las Noticias", "https://diariolasnoticias.com/"),
    ]
    .iter()
    .map(|(name, url)| Source::new(*name, *url))
    .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Defaults with the built-in source list
    pub fn with_default_sources() -> Self {
        Self {
            sources: default_sources(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::with_default_sources();

        if let Some(v) = env_parse("PORTADA_MAX_CONCURRENT_REQUESTS") {
            config.crawler.max_concurrent_requests = v;
        }
        if let Some(v) = env_parse("PORTADA_LIMIT_PER_HOST") {
            config.crawler.limit_per_host = v;
        }
        if let Some(v) = env_parse("PORTADA_REQUEST_TIMEOUT") {
            config.crawler.request_timeout_secs = v;
        }
        if let Ok(v) = std::env::var("PORTADA_USER_AGENT") {
            config.crawler.user_agent = v;
        }
        if let Some(v) = env_parse("PORTADA_RATE_LIMIT") {
            config.crawler.rate_limit = v;
        }
        if let Some(v) = env_parse("PORTADA_MAX_RETRIES") {
            config.crawler.max_retries = v;
        }
        if let Ok(v) = std::env::var("PORTADA_SQLITE_PATH") {
            config.database.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse("PORTADA_CLASSIFIER_ENABLED") {
            config.classifier.enabled = v;
        }
        if let Ok(v) = std::env::var("PORTADA_CLASSIFIER_ENDPOINT") {
            config.classifier.endpoint = v;
        }
        if let Ok(v) = std::env::var("PORTADA_CLASSIFIER_MODEL") {
            config.classifier.model = v;
        }
        if let Some(v) = env_parse("PORTADA_RELEVANCE_THRESHOLD") {
            config.classifier.relevance_threshold = v;
        }
        config.classifier.api_key = std::env::var("PORTADA_CLASSIFIER_API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty());
        if let Ok(v) = std::env::var("PORTADA_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("PORTADA_LOG_FORMAT") {
            config.logging.format = v;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Missing sections fall back to their defaults; a file without any
    /// `[[sources]]` entry gets the built-in source list.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        if config.sources.is_empty() {
            config.sources = default_sources();
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawler.max_concurrent_requests == 0 {
            anyhow::bail!("max_concurrent_requests must be greater than 0");
        }

        if self.crawler.limit_per_host == 0 {
            anyhow::bail!("limit_per_host must be greater than 0");
        }

        if self.crawler.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.classifier.relevance_threshold) {
            anyhow::bail!("relevance_threshold must be between 0.0 and 1.0");
        }

        if self.classifier.enabled && self.classifier.api_key.is_none() {
            anyhow::bail!("classifier is enabled but no API key is configured");
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            let url = Url::parse(&source.url)
                .with_context(|| format!("Invalid URL for source {}", source.name))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("Source {} must use http or https", source.name);
            }
            if !names.insert(source.name.to_lowercase()) {
                anyhow::bail!("Duplicate source name: {}", source.name);
            }
        }

        Ok(())
    }

    /// Sources with `enabled = true`, in configured order
    pub fn enabled_sources(&self) -> Vec<Source> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }

    /// Case-insensitive lookup by source name
    pub fn source_by_name(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}
