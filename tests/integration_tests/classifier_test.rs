//! Relevance classification against a mocked chat completions endpoint

use portada::classifier::{Classifier, HttpClassifier, KeywordFilter, RelevanceFilter};
use portada::config::ClassifierConfig;
use portada::models::ArticleRecord;
use portada::storage::{ArticleStore, MemoryArticleStore};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(url: &str, title: &str) -> ArticleRecord {
    ArticleRecord::new(
        url,
        "Diario",
        title,
        None,
        "La intendenta Susana Laciar recorrio las obras de bacheo en el microcentro.",
        None,
    )
    .unwrap()
}

fn config(server: &MockServer) -> ClassifierConfig {
    ClassifierConfig {
        enabled: true,
        endpoint: format!("{}/openai/v1/chat/completions", server.uri()),
        api_key: Some("gsk_test".to_string()),
        timeout_secs: 2,
        ..Default::default()
    }
}

fn chat_response(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

#[tokio::test]
async fn test_http_classifier_request_and_verdict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({"model": "llama-3.3-70b-versatile", "max_tokens": 500})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            "```json\n{\"is_relevant\": true, \"relevance_score\": 0.85, \"reasoning\": \"Gestion municipal\", \"keywords_found\": [\"laciar\", \"bacheo\"]}\n```",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let classifier = HttpClassifier::new(&config(&mock_server)).unwrap();
    let verdict = classifier
        .classify(
            &record("https://diario.com.ar/nota/1-bacheo", "Bacheo en el microcentro"),
            "Noticias municipales",
        )
        .await
        .unwrap();

    assert!(verdict.is_relevant);
    assert_eq!(verdict.score, 0.85);
    assert_eq!(verdict.rationale, "Gestion municipal");
    assert_eq!(verdict.keywords, vec!["laciar".to_string(), "bacheo".to_string()]);
}

#[tokio::test]
async fn test_filter_applies_threshold_and_absorbs_errors() {
    let mock_server = MockServer::start().await;

    // Relevant but under the 0.6 threshold
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            r#"{"is_relevant": true, "relevance_score": 0.4, "reasoning": "tangencial"}"#,
        )))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    // Then the service fails
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let filter = RelevanceFilter::from_config(&config(&mock_server)).unwrap();
    let kept = filter
        .filter(vec![
            record("https://diario.com.ar/nota/1-uno", "Uno"),
            record("https://diario.com.ar/nota/2-dos", "Dos"),
        ])
        .await;

    assert!(kept.is_empty());
    let stats = filter.stats();
    assert_eq!(stats.analyzed, 2);
    assert_eq!(stats.relevant, 0);
    assert_eq!(stats.not_relevant, 1);
    assert_eq!(stats.errors, 1);
}

#[tokio::test]
async fn test_unparsable_answer_is_not_relevant() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_response("No puedo responder a eso.")),
        )
        .mount(&mock_server)
        .await;

    let filter = RelevanceFilter::from_config(&config(&mock_server)).unwrap();
    let verdict = filter
        .evaluate(&record("https://diario.com.ar/nota/3-tres", "Tres"))
        .await;

    assert!(!verdict.is_relevant);
    assert_eq!(verdict.score, 0.0);
    assert_eq!(filter.stats().errors, 1);
}

#[tokio::test]
async fn test_keyword_then_classifier_then_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            r#"{"is_relevant": true, "relevance_score": 0.9, "reasoning": "municipal", "keywords_found": ["laciar"]}"#,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let municipal = record("https://diario.com.ar/nota/4-municipal", "Laciar anuncio obras");
    let deportes = ArticleRecord::new(
        "https://diario.com.ar/nota/5-deportes",
        "Diario",
        "Gano el equipo local",
        None,
        "El clasico se jugo con estadio lleno y victoria del local.",
        None,
    )
    .unwrap();

    let keywords = KeywordFilter::new(&["laciar"]);
    let candidates = keywords.filter(vec![municipal, deportes]);
    assert_eq!(candidates.len(), 1);

    let store = MemoryArticleStore::new();
    store.insert_bulk(&candidates);

    let filter = RelevanceFilter::from_config(&config(&mock_server)).unwrap();
    for (record, verdict) in filter.filter(candidates).await {
        store.save_classification(record.url(), &verdict).unwrap();
    }

    let saved = store
        .classification("https://diario.com.ar/nota/4-municipal")
        .unwrap()
        .unwrap();
    assert!(saved.is_relevant);
    assert_eq!(saved.keywords, vec!["laciar".to_string()]);
}
