//! Black-box tests of the HTTP surface: a full router served on an ephemeral
//! listener, exercised with a plain HTTP client. Embeddings are mocked and the
//! completion client is a scripted fake; the vector and syllabus stores are
//! real SQLite.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use tutorsmith::completions::{Completion, CompletionClient, CompletionRequest, Usage};
use tutorsmith::embeddings::MockEmbeddingProvider;
use tutorsmith::orchestrator::Orchestrator;
use tutorsmith::retrieval::RetrievalService;
use tutorsmith::server::{self, AppState};
use tutorsmith::stores::SqliteVectorStore;
use tutorsmith::syllabus::{SqliteSyllabusStore, SyllabusLevel, SyllabusNode, SyllabusStore};
use tutorsmith::types::ServiceError;

/// Completion client that echoes a canned answer.
struct ScriptedCompletions;

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ServiceError> {
        Ok(Completion {
            content: "A generated lesson.".to_string(),
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
        })
    }
}

/// Spawns the full service on an ephemeral port and returns its base URL.
/// The temp dir must outlive the server, so it is returned too.
async fn spawn_app() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteVectorStore::open(dir.path().join("app.db"))
        .await
        .unwrap();
    let syllabus = SqliteSyllabusStore::from_connection(store.connection())
        .await
        .unwrap();

    syllabus
        .upsert_node(SyllabusNode {
            id: "gs1".to_string(),
            parent_id: None,
            title: "General Studies I".to_string(),
            description: None,
            level: SyllabusLevel::Subject,
            order: 1,
        })
        .await
        .unwrap();
    syllabus
        .upsert_node(SyllabusNode {
            id: "hist".to_string(),
            parent_id: Some("gs1".to_string()),
            title: "History".to_string(),
            description: Some("Indian history".to_string()),
            level: SyllabusLevel::Paper,
            order: 1,
        })
        .await
        .unwrap();

    let retrieval = RetrievalService::new(
        Arc::new(MockEmbeddingProvider::new()),
        Arc::new(store),
    );
    let orchestrator = Orchestrator::new(retrieval.clone(), Arc::new(ScriptedCompletions));
    let state = AppState::new(retrieval, Arc::new(syllabus), orchestrator);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, server::router(state).into_make_service()).await {
            tracing::error!("test server error: {err:?}");
        }
    });

    (format!("http://{addr}"), dir)
}

#[tokio::test]
async fn ingest_chunks_and_reports_the_count() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ingest"))
        .json(&json!({
            "contentId": "doc-1",
            "text": "Sentence one about polity. Sentence two about rights.",
            "metadata": {"source": "test"},
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["chunksCount"], json!(1));
}

#[tokio::test]
async fn ingest_requires_content_id_and_text() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ingest"))
        .json(&json!({"contentId": "doc-1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("contentId and text are required"));
}

#[tokio::test]
async fn ingest_rejects_unknown_content_types() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ingest"))
        .header("content-type", "text/plain")
        .body("just some text")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 415);

    let response = client
        .post(format!("{base}/ingest"))
        .body("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 415, "missing content type is unsupported");
}

#[tokio::test]
async fn ingest_multipart_is_not_implemented() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ingest"))
        .header("content-type", "multipart/form-data; boundary=xyz")
        .body("--xyz--")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 501);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("File upload not implemented yet"));
}

#[tokio::test]
async fn search_requires_a_query() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/search"))
        .json(&json!({"matchCount": 5}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("query is required"));
}

#[tokio::test]
async fn search_finds_ingested_content_and_annotates_the_syllabus() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let text = "The Preamble declares India a sovereign socialist secular democratic republic.";
    client
        .post(format!("{base}/ingest"))
        .json(&json!({"contentId": "polity-1", "text": text}))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{base}/search"))
        .json(&json!({"query": text, "syllabusNodeId": "hist"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], json!(text));
    assert_eq!(results[0]["contentId"], json!("polity-1"));
    assert!(results[0]["similarity"].as_f64().unwrap() > 0.99);

    assert_eq!(body["syllabusContext"]["node"]["id"], json!("hist"));
    let path = body["syllabusContext"]["path"].as_array().unwrap();
    assert_eq!(path[0]["id"], json!("gs1"));
    assert_eq!(path[1]["id"], json!("hist"));
}

#[tokio::test]
async fn search_with_missing_syllabus_node_degrades_gracefully() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let text = "Fundamental rights are enforceable in courts.";
    client
        .post(format!("{base}/ingest"))
        .json(&json!({"contentId": "polity-2", "text": text}))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{base}/search"))
        .json(&json!({"query": text, "syllabusNodeId": "ghost"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["syllabusContext"], Value::Null);
    assert!(
        body["syllabusError"].as_str().unwrap().contains("ghost"),
        "the missing node surfaces in syllabusError, not as a failure"
    );
    assert!(!body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_threshold_above_one_returns_no_results() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let text = "Directive principles guide state policy.";
    client
        .post(format!("{base}/ingest"))
        .json(&json!({"contentId": "polity-3", "text": text}))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{base}/search"))
        .json(&json!({"query": text, "matchThreshold": 1.1}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn orchestrate_requires_type_and_query() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/orchestrate"))
        .json(&json!({"type": "lesson"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("type and query are required"));
    assert!(body.get("result").is_none(), "no result on failure");
}

#[tokio::test]
async fn orchestrate_returns_the_completion_with_context_stats() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let text = "The Harappan cities had planned drainage systems.";
    client
        .post(format!("{base}/ingest"))
        .json(&json!({"contentId": "hist-1", "text": text}))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{base}/orchestrate"))
        .json(&json!({
            "type": "lesson",
            "query": text,
            "parameters": {"temperature": 0.3},
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], json!("A generated lesson."));
    assert_eq!(body["usage"]["total_tokens"], json!(120));
    assert_eq!(body["context"]["docsCount"], json!(1));
}
