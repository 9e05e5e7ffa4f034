/// Integration tests for the lookup-or-fetch-or-store flow against a real SQLite file
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tempfile::TempDir;
use translator_bot::{
    completion::CompletionClient,
    config::CompletionConfig,
    error::{CompletionError, ServiceError},
    service::TranslationService,
    stats::StatsReporter,
    store::{SqliteTranslationStore, TranslationStore},
};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn completion_config(base_url: &str) -> CompletionConfig {
    CompletionConfig {
        api_key: "sk-test".to_string(),
        base_url: base_url.to_string(),
        model: "gpt-4o".to_string(),
        temperature: 0.2,
        max_tokens: 1000,
        timeout_seconds: 5,
        target_language: "ru".to_string(),
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 50, "completion_tokens": 10, "total_tokens": 60}
    })
}

struct Harness {
    _dir: TempDir,
    store: Arc<SqliteTranslationStore>,
    service: Arc<TranslationService>,
}

async fn create_harness(server: &MockServer) -> Harness {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("translations.db").display());
    let store = Arc::new(SqliteTranslationStore::connect(&url, 5).await.unwrap());

    let translator = Arc::new(CompletionClient::new(
        reqwest::Client::new(),
        completion_config(&server.uri()),
    ));
    let service = Arc::new(TranslationService::new(store.clone(), translator, "ru"));

    Harness {
        _dir: dir,
        store,
        service,
    }
}

#[tokio::test]
async fn test_miss_then_hits_share_one_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  Привет  ")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = create_harness(&server).await;

    let first = harness.service.get_translation("Hello").await.unwrap().unwrap();
    let second = harness.service.get_translation(" hello ").await.unwrap().unwrap();
    let third = harness.service.get_translation("HELLO").await.unwrap().unwrap();

    assert_eq!(first.source, "hello");
    assert_eq!(first.translation, "Привет");
    assert_eq!(first.view_count, 1);
    assert_eq!(second.view_count, 2);
    assert_eq!(third.view_count, 3);
    assert_eq!(first.id, third.id);
    assert!(third.updated_at >= first.created_at);
    assert_eq!(third.created_at, first.created_at);
}

#[tokio::test]
async fn test_blank_input_never_calls_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
        .expect(0)
        .mount(&server)
        .await;

    let harness = create_harness(&server).await;

    assert!(harness.service.get_translation("").await.unwrap().is_none());
    assert!(harness.service.get_translation("   ").await.unwrap().is_none());
    assert_eq!(harness.store.summary().await.unwrap().total_count, 0);
}

#[tokio::test]
async fn test_concurrent_first_requests_create_one_record() {
    const REQUESTS: usize = 8;

    let server = MockServer::start().await;
    // Slow enough that every request misses before the first insert lands
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("растопить лёд"))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let harness = create_harness(&server).await;

    let handles: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let service = harness.service.clone();
            tokio::spawn(async move { service.get_translation("Break the ice").await })
        })
        .collect();

    for handle in handles {
        let record = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(record.source, "break the ice");
        assert_eq!(record.translation, "растопить лёд");
    }

    let summary = harness.store.summary().await.unwrap();
    assert_eq!(summary.total_count, 1);
    assert_eq!(summary.total_views, REQUESTS as i64);

    let record = harness.store.find("break the ice").await.unwrap().unwrap();
    assert_eq!(record.view_count, REQUESTS as i64);
}

#[tokio::test]
async fn test_missing_choices_is_malformed_and_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        })))
        .mount(&server)
        .await;

    let harness = create_harness(&server).await;

    let err = harness.service.get_translation("Hello").await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Completion(CompletionError::MalformedResponse(_))
    ));
    assert_eq!(harness.store.summary().await.unwrap().total_count, 0);
}

#[tokio::test]
async fn test_upstream_error_status_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let harness = create_harness(&server).await;

    let err = harness.service.get_translation("Hello").await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Completion(CompletionError::Transport(_))
    ));
    assert!(err.to_string().starts_with("HTTP error: 500"));
    assert_eq!(harness.store.summary().await.unwrap().total_count, 0);
}

#[tokio::test]
async fn test_stats_over_persisted_records() {
    let server = MockServer::start().await;
    let harness = create_harness(&server).await;

    for (source, views) in [("epsilon", 5), ("beta", 1), ("alpha", 1), ("gamma", 3)] {
        let mut record = harness.store.insert(source, "x").await.unwrap();
        for _ in 1..views {
            record = harness.store.increment_view(&record).await.unwrap();
        }
    }

    let reporter = StatsReporter::new(harness.store.clone());
    let stats = reporter.collect().await.unwrap();

    assert_eq!(stats.total_count, 4);
    assert_eq!(stats.total_views, 10);
    assert_eq!(stats.avg_views, 2.5);
    assert_eq!(stats.popular_pct, 50.0);
    assert_eq!(stats.one_view_pct, 50.0);
    let top: Vec<(&str, i64)> = stats.top.iter().map(|(s, v)| (s.as_str(), *v)).collect();
    assert_eq!(top, vec![("epsilon", 5), ("gamma", 3), ("alpha", 1), ("beta", 1)]);

    let text = reporter.get_stats_text().await.unwrap();
    assert!(text.contains("Average views per record: 2.50"));
    assert!(text.contains("Records with >1 view: 2 (50.0%)"));
}

#[tokio::test]
async fn test_records_survive_reconnect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("надёжный")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("translations.db").display());

    {
        let store = Arc::new(SqliteTranslationStore::connect(&url, 2).await.unwrap());
        let translator = Arc::new(CompletionClient::new(
            reqwest::Client::new(),
            completion_config(&server.uri()),
        ));
        let service = TranslationService::new(store.clone(), translator, "ru");
        service.get_translation("Reliable").await.unwrap();
        store.pool().close().await;
    }

    let store = SqliteTranslationStore::connect(&url, 2).await.unwrap();
    let record = store.find("reliable").await.unwrap().unwrap();
    assert_eq!(record.translation, "надёжный");
    assert_eq!(record.view_count, 1);
}
