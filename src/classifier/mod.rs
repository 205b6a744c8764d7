//! Relevance classification
//!
//! Articles that pass the keyword pre-filter are sent to a chat-completions
//! service that answers with a JSON verdict. [`RelevanceFilter`] applies
//! the score threshold and turns every failure into "not relevant, score 0"
//! so classification never aborts a run.

pub mod keywords;

pub use keywords::KeywordFilter;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::ClassifierConfig;
use crate::models::ArticleRecord;
use crate::utils::truncate_text;

/// Body characters included in the prompt
const BODY_EXCERPT_CHARS: usize = 1500;

const SYSTEM_PROMPT: &str = "Eres un asistente que analiza noticias y responde solo en JSON.";

/// Classification service errors
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Transport failure or timeout
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Classifier returned HTTP {0}")]
    Status(u16),

    /// No message content in the response
    #[error("Classifier returned no content")]
    EmptyResponse,

    /// Content was not a usable JSON verdict
    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),
}

/// Verdict for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub is_relevant: bool,

    /// 0.0 - 1.0
    #[serde(default, alias = "relevance_score")]
    pub score: f64,

    #[serde(default, alias = "reasoning")]
    pub rationale: String,

    #[serde(default, alias = "keywords_found")]
    pub keywords: Vec<String>,
}

impl Classification {
    /// Verdict used whenever classification fails
    pub fn not_relevant(rationale: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            score: 0.0,
            rationale: rationale.into(),
            keywords: Vec::new(),
        }
    }
}

/// Anything that can judge an article against free-text criteria
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        record: &ArticleRecord,
        criteria: &str,
    ) -> Result<Classification, ClassifierError>;
}

// ============================================================================
// HTTP classifier
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Classifier backed by an OpenAI-compatible chat completions endpoint
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpClassifier {
    /// # Errors
    ///
    /// Returns `ClassifierError::Request` if the HTTP client cannot be created
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
        })
    }

    fn build_prompt(record: &ArticleRecord, criteria: &str) -> String {
        let body = if record.body().is_empty() {
            String::from("Sin contenido")
        } else {
            truncate_text(record.body(), BODY_EXCERPT_CHARS)
        };

        format!(
            r#"Eres un asistente que filtra noticias según su relevancia para un contexto específico.

CONTEXTO DE FILTRADO:
{criteria}

NOTICIA A ANALIZAR:
- Título: {title}
- Subtítulo: {subtitle}
- Fuente: {source}
- Contenido (primeros {BODY_EXCERPT_CHARS} caracteres): {body}

INSTRUCCIONES:
Analiza si esta noticia es relevante para el contexto especificado.
Responde ÚNICAMENTE con un JSON válido (sin markdown):

{{
    "is_relevant": true/false,
    "relevance_score": 0.0 a 1.0,
    "reasoning": "Explicación breve de por qué es o no relevante",
    "keywords_found": ["lista", "de", "términos", "relevantes", "encontrados"]
}}"#,
            title = record.title(),
            subtitle = record.subtitle().unwrap_or("N/A"),
            source = record.source_name(),
        )
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        record: &ArticleRecord,
        criteria: &str,
    ) -> Result<Classification, ClassifierError> {
        let prompt = Self::build_prompt(record, criteria);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.1,
            max_tokens: 500,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse)?;

        parse_verdict(&content)
    }
}

/// Parse the model's answer, tolerating markdown code fences
pub fn parse_verdict(text: &str) -> Result<Classification, ClassifierError> {
    let json = extract_json(text);
    let mut verdict: Classification = serde_json::from_str(json).map_err(|e| {
        ClassifierError::InvalidResponse(format!("{e}: {}", truncate_text(text, 200)))
    })?;
    verdict.score = verdict.score.clamp(0.0, 1.0);
    Ok(verdict)
}

/// JSON object inside a code block or surrounding prose
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip the language tag line
        let content = after.find('\n').map_or(after, |nl| &after[nl + 1..]);
        if let Some(end) = content.find("```") {
            return content[..end].trim();
        }
        return content.trim();
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

// ============================================================================
// Relevance filter
// ============================================================================

/// Filter counters (thread-safe)
#[derive(Debug, Default)]
struct FilterCounters {
    analyzed: AtomicU64,
    relevant: AtomicU64,
    not_relevant: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of relevance filter statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub analyzed: u64,
    pub relevant: u64,
    pub not_relevant: u64,
    pub errors: u64,
}

/// Applies a classifier and a score threshold to extracted articles
pub struct RelevanceFilter {
    classifier: Box<dyn Classifier>,
    criteria: String,
    threshold: f64,
    counters: FilterCounters,
}

impl RelevanceFilter {
    pub fn new(
        classifier: Box<dyn Classifier>,
        criteria: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            classifier,
            criteria: criteria.into(),
            threshold,
            counters: FilterCounters::default(),
        }
    }

    /// Build the HTTP-backed filter from configuration
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::Request` if the HTTP client cannot be created
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let classifier = HttpClassifier::new(config)?;
        Ok(Self::new(
            Box::new(classifier),
            config.context_prompt.clone(),
            config.relevance_threshold,
        ))
    }

    /// Classify one record; `is_relevant` in the result is the final decision
    ///
    /// Never fails: errors become a not-relevant verdict with score 0.
    pub async fn evaluate(&self, record: &ArticleRecord) -> Classification {
        self.counters.analyzed.fetch_add(1, Ordering::Relaxed);

        match self.classifier.classify(record, &self.criteria).await {
            Ok(mut verdict) => {
                verdict.is_relevant = verdict.is_relevant && verdict.score >= self.threshold;
                let counter = if verdict.is_relevant {
                    &self.counters.relevant
                } else {
                    &self.counters.not_relevant
                };
                counter.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    url = %record.url(),
                    relevant = verdict.is_relevant,
                    score = verdict.score,
                    "Article classified"
                );
                verdict
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(url = %record.url(), error = %e, "Classification failed");
                Classification::not_relevant(format!("Classification error: {e}"))
            }
        }
    }

    /// Keep the relevant records together with their verdicts
    pub async fn filter(
        &self,
        records: Vec<ArticleRecord>,
    ) -> Vec<(ArticleRecord, Classification)> {
        let total = records.len();
        let mut relevant = Vec::new();

        for (i, record) in records.into_iter().enumerate() {
            tracing::debug!(
                index = i + 1,
                total,
                title = %truncate_text(record.title(), 50),
                "Classifying article"
            );
            let verdict = self.evaluate(&record).await;
            if verdict.is_relevant {
                relevant.push((record, verdict));
            }
        }

        relevant
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            analyzed: self.counters.analyzed.load(Ordering::Relaxed),
            relevant: self.counters.relevant.load(Ordering::Relaxed),
            not_relevant: self.counters.not_relevant.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}
