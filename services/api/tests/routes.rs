//! services/api/tests/routes.rs
//!
//! Drives the HTTP router end to end against a scripted AI service and an
//! in-memory key-value store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::web::{build_router, state::AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use boardvision_core::{
    contract::{GenerateContentRequest, Part},
    gateway::{AiGateway, CHAT_FAILURE_REPLY},
    memory_store::InMemoryKeyValueStore,
    ports::{ContentGenerationService, KeyValueStore, PortError, PortResult},
    session::HISTORY_KEY,
};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

//=========================================================================================
// Fixtures
//=========================================================================================

/// Answers each call with the next scripted reply and records the request.
#[derive(Default)]
struct ScriptedService {
    replies: Mutex<VecDeque<PortResult<Option<String>>>>,
    requests: Mutex<Vec<GenerateContentRequest>>,
}

impl ScriptedService {
    fn new(replies: Vec<PortResult<Option<String>>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<GenerateContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerationService for ScriptedService {
    async fn generate_content(&self, request: &GenerateContentRequest) -> PortResult<Option<String>> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(PortError::Transport("no scripted reply".to_string())))
    }
}

/// Blocks every call until released, so a request can be held in flight.
struct GatedService {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ContentGenerationService for GatedService {
    async fn generate_content(&self, _request: &GenerateContentRequest) -> PortResult<Option<String>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Some("Done thinking.".to_string()))
    }
}

fn analysis_json(title: &str) -> String {
    json!({
        "detectedType": "code",
        "suggestedLanguage": "Python",
        "reasoning": "Pseudo-code with a loop",
        "title": title,
        "transcription": "lo, hi = 0, len(xs) - 1",
        "explanation": "Halve the search range until the target is found.",
        "code": "def search(xs, t):\n    lo, hi = 0, len(xs) - 1",
        "diagram": "```mermaid\nA --> B\n```",
        "flashcards": [
            {"term": "Midpoint", "definition": "(lo + hi) // 2"},
            {"term": "Complexity", "definition": "O(log n)"},
            {"term": "Precondition", "definition": "Sorted input"}
        ],
        "secondaryInfo": {"complexity": "O(log n)"}
    })
    .to_string()
}

fn quiz_json() -> String {
    let questions: Vec<Value> = (0..5)
        .map(|i| {
            json!({
                "question": format!("Question {}", i),
                "options": ["a", "b", "c", "d"],
                "correctAnswerIndex": i % 4,
                "explanation": "Because."
            })
        })
        .collect();
    Value::Array(questions).to_string()
}

async fn app_with(
    service: Arc<dyn ContentGenerationService>,
    store: Arc<InMemoryKeyValueStore>,
) -> Router {
    let state = AppState::load(AiGateway::new(service), store).await;
    build_router(Arc::new(state))
}

async fn scripted_app(
    replies: Vec<PortResult<Option<String>>>,
) -> (Router, Arc<ScriptedService>, Arc<InMemoryKeyValueStore>) {
    let service = ScriptedService::new(replies);
    let store = Arc::new(InMemoryKeyValueStore::new());
    let app = app_with(service.clone(), store.clone()).await;
    (app, service, store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

const BOUNDARY: &str = "boardvision-test-boundary";

async fn upload(app: &Router, files: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
    let mut body = Vec::new();
    for (name, mime, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/uploads")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn upload_two_boards(app: &Router) {
    let (status, body) = upload(
        app,
        &[
            ("board1.png", "image/png", &[0x89, b'P', b'N', b'G'][..]),
            ("board2.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF][..]),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["added"], 2);
}

async fn analyze(app: &Router) -> (StatusCode, Value) {
    send(app, "POST", "/analyze", Some(json!({}))).await
}

//=========================================================================================
// Analysis
//=========================================================================================

#[tokio::test]
async fn analyze_without_uploads_is_rejected_without_calling_the_service() {
    let (app, service, _) = scripted_app(vec![]).await;
    let (status, _) = analyze(&app).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(service.requests().is_empty());
}

#[tokio::test]
async fn uploads_skip_non_images() {
    let (app, _, _) = scripted_app(vec![]).await;
    let (status, body) = upload(
        &app,
        &[
            ("board.png", "image/png", &b"png"[..]),
            ("notes.txt", "text/plain", &b"hello"[..]),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["added"], 1);
    assert_eq!(body["uploads"][0]["mimeType"], "image/png");

    let id = body["uploads"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(&app, "DELETE", &format!("/uploads/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/uploads/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn binary_search_then_refinement_builds_history() {
    let (app, service, _) = scripted_app(vec![
        Ok(Some(analysis_json("Binary Search"))),
        Ok(Some(analysis_json("Binary Search (iterative)"))),
    ])
    .await;
    upload_two_boards(&app).await;

    let (status, body) = analyze(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["title"], "Binary Search");
    assert_eq!(body["result"]["flashcards"].as_array().unwrap().len(), 3);

    let (_, history) = send(&app, "GET", "/history", None).await;
    assert_eq!(history["items"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "POST",
        "/analyze",
        Some(json!({"refinement": "Make it iterative"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = send(&app, "GET", "/history", None).await;
    let titles: Vec<&str> = history["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["result"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Binary Search (iterative)", "Binary Search"]);

    let requests = service.requests();
    let images = requests[0].contents[0]
        .parts
        .iter()
        .filter(|p| matches!(p, Part::InlineData { .. }))
        .count();
    assert_eq!(images, 2);
    let refined_prompt = requests[1].contents[0].parts.iter().any(|p| {
        matches!(p, Part::Text(t) if t.contains("IMPORTANT REFINEMENT: Make it iterative"))
    });
    assert!(refined_prompt);
}

#[tokio::test]
async fn empty_response_keeps_uploads_and_history() {
    let (app, _, store) = scripted_app(vec![Ok(Some(String::new()))]).await;
    upload_two_boards(&app).await;

    let (status, body) = analyze(&app).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, Value::String("Analysis engine failure.".to_string()));

    let (_, workspace) = send(&app, "GET", "/workspace", None).await;
    assert_eq!(workspace["uploads"].as_array().unwrap().len(), 2);
    assert_eq!(workspace["hasResult"], false);
    assert_eq!(workspace["flags"]["isProcessing"], false);
    assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_response_is_a_failure_notice() {
    let (app, _, _) = scripted_app(vec![Ok(Some("{\"title\": \"half\"}".to_string()))]).await;
    upload_two_boards(&app).await;
    let (status, _) = analyze(&app).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (status, _) = send(&app, "GET", "/result", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn diagram_is_normalized() {
    let (app, _, _) = scripted_app(vec![Ok(Some(analysis_json("Flow")))]).await;
    upload_two_boards(&app).await;
    analyze(&app).await;

    let (status, body) = send(&app, "GET", "/result/diagram", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["diagram"], "flowchart TD\nA --> B");
}

#[tokio::test]
async fn dropped_analyze_request_does_not_leave_analysis_running() {
    let gated = Arc::new(GatedService {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let app = app_with(gated.clone(), Arc::new(InMemoryKeyValueStore::new())).await;
    upload_two_boards(&app).await;

    // The client gives up while the AI call is still held.
    let dropped = tokio::time::timeout(Duration::from_millis(50), analyze(&app)).await;
    assert!(dropped.is_err());
    gated.entered.notified().await;
    gated.release.notify_one();

    let mut flags = Value::Null;
    for _ in 0..100 {
        let (_, workspace) = send(&app, "GET", "/workspace", None).await;
        flags = workspace["flags"].clone();
        if flags["isProcessing"] == false {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(flags["isProcessing"], false);

    // The gated reply is not an analysis, so the next submit fails upstream
    // instead of being turned away as a duplicate.
    let second_app = app.clone();
    let second = tokio::spawn(async move { analyze(&second_app).await });
    gated.entered.notified().await;
    gated.release.notify_one();
    let (status, _) = second.await.unwrap();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

//=========================================================================================
// Quiz
//=========================================================================================

#[tokio::test]
async fn quiz_is_generated_and_scored() {
    let (app, _, _) = scripted_app(vec![
        Ok(Some(analysis_json("Heaps"))),
        Ok(Some(quiz_json())),
    ])
    .await;
    upload_two_boards(&app).await;
    analyze(&app).await;

    let (status, body) = send(&app, "POST", "/quiz", None).await;
    assert_eq!(status, StatusCode::OK);
    let quiz = body["quiz"].as_array().unwrap().clone();
    assert_eq!(quiz.len(), 5);

    let answers: serde_json::Map<String, Value> = quiz
        .iter()
        .map(|q| (q["id"].as_str().unwrap().to_string(), q["correctAnswerIndex"].clone()))
        .collect();
    let (status, score) = send(&app, "POST", "/quiz/score", Some(json!({ "answers": answers }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score, json!({"score": 5, "total": 5, "grade": "S"}));

    let (_, history) = send(&app, "GET", "/history", None).await;
    assert_eq!(history["items"][0]["result"]["quiz"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn quiz_failure_is_reported() {
    let (app, _, _) = scripted_app(vec![
        Ok(Some(analysis_json("Heaps"))),
        Err(PortError::Transport("503 Service Unavailable".to_string())),
    ])
    .await;
    upload_two_boards(&app).await;
    analyze(&app).await;

    let (status, body) = send(&app, "POST", "/quiz", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, Value::String("Quiz failed.".to_string()));

    let (_, workspace) = send(&app, "GET", "/workspace", None).await;
    assert_eq!(workspace["flags"]["isGeneratingQuiz"], false);
}

//=========================================================================================
// Chat
//=========================================================================================

#[tokio::test]
async fn chat_replies_and_absorbs_failures() {
    let (app, service, _) = scripted_app(vec![
        Ok(Some(analysis_json("Tries"))),
        Ok(Some("Here is a clearer explanation.".to_string())),
        Err(PortError::Transport("connection reset".to_string())),
    ])
    .await;
    upload_two_boards(&app).await;
    analyze(&app).await;

    let (status, body) = send(&app, "POST", "/chat/action", Some(json!({"action": "explain this better"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["text"], "Here is a clearer explanation.");
    assert_eq!(body["reply"]["role"], "model");

    let (status, body) = send(&app, "POST", "/chat", Some(json!({"message": "Look at the image again"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["text"], CHAT_FAILURE_REPLY);

    let (_, transcript) = send(&app, "GET", "/chat", None).await;
    let texts: Vec<&str> = transcript["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(
        texts,
        vec![
            "Please explain this better.",
            "Here is a clearer explanation.",
            "Look at the image again",
            CHAT_FAILURE_REPLY,
        ]
    );

    // The second turn mentions the image, so both uploads ride along.
    let requests = service.requests();
    let last_turn = requests[2].contents.last().unwrap();
    assert_eq!(last_turn.parts.len(), 3);
    assert_eq!(requests[2].contents.len(), 3);
}

#[tokio::test]
async fn second_chat_message_while_one_is_outstanding_is_rejected() {
    let analysis = ScriptedService::new(vec![Ok(Some(analysis_json("Graphs")))]);
    let store = Arc::new(InMemoryKeyValueStore::new());
    let analysis_app = app_with(analysis, store.clone()).await;
    upload_two_boards(&analysis_app).await;
    analyze(&analysis_app).await;

    // Reload over the same store and reopen the stored result for chatting.
    let gated = Arc::new(GatedService {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let app = app_with(gated.clone(), store).await;
    let (_, history) = send(&app, "GET", "/history", None).await;
    let id = history["items"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(&app, "POST", &format!("/history/{}/open", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let first_app = app.clone();
    let first = tokio::spawn(async move {
        send(&first_app, "POST", "/chat", Some(json!({"message": "First"}))).await
    });
    gated.entered.notified().await;

    let (status, _) = send(&app, "POST", "/chat", Some(json!({"message": "Second"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    gated.release.notify_one();
    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["text"], "Done thinking.");

    let (_, transcript) = send(&app, "GET", "/chat", None).await;
    assert_eq!(transcript["messages"].as_array().unwrap().len(), 2);
}

//=========================================================================================
// Persisted collections
//=========================================================================================

#[tokio::test]
async fn saving_flashcards_twice_adds_nothing_new() {
    let (app, _, _) = scripted_app(vec![Ok(Some(analysis_json("Sorting")))]).await;
    upload_two_boards(&app).await;
    analyze(&app).await;

    let (status, body) = send(&app, "POST", "/flashcards", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"added": 3, "total": 3}));

    let (_, body) = send(&app, "POST", "/flashcards", Some(json!({"indices": [0, 2]}))).await;
    assert_eq!(body, json!({"added": 0, "total": 3}));

    let (_, cards) = send(&app, "GET", "/flashcards", None).await;
    let first = &cards["cards"][0];
    assert_eq!(first["deckName"], "Sorting");

    let id = first["id"].as_str().unwrap().to_string();
    let (status, _) = send(&app, "DELETE", &format!("/flashcards/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/flashcards", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, cards) = send(&app, "GET", "/flashcards", None).await;
    assert!(cards["cards"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn state_survives_a_restart() {
    let (app, _, store) = scripted_app(vec![Ok(Some(analysis_json("Stacks")))]).await;
    upload_two_boards(&app).await;
    analyze(&app).await;
    send(&app, "POST", "/flashcards", Some(json!({}))).await;
    let (_, theme) = send(&app, "POST", "/theme/toggle", None).await;
    assert_eq!(theme["theme"], "dark");

    let (_, history_before) = send(&app, "GET", "/history", None).await;
    let (_, cards_before) = send(&app, "GET", "/flashcards", None).await;

    let restarted = app_with(ScriptedService::new(vec![]), store).await;
    let (_, history_after) = send(&restarted, "GET", "/history", None).await;
    let (_, cards_after) = send(&restarted, "GET", "/flashcards", None).await;
    let (_, theme_after) = send(&restarted, "GET", "/theme", None).await;

    assert_eq!(history_after, history_before);
    assert_eq!(cards_after, cards_before);
    assert_eq!(theme_after["theme"], "dark");

    let (_, workspace) = send(&restarted, "GET", "/workspace", None).await;
    assert_eq!(workspace["hasResult"], false);
    assert!(workspace["uploads"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_stored_values_start_empty() {
    let store = Arc::new(InMemoryKeyValueStore::with_entries([
        (HISTORY_KEY, "{\"not\": \"a list\"}"),
        ("boardvision_theme", "\"sepia\""),
    ]));
    let app = app_with(ScriptedService::new(vec![]), store).await;
    let (_, history) = send(&app, "GET", "/history", None).await;
    assert!(history["items"].as_array().unwrap().is_empty());
    let (_, theme) = send(&app, "GET", "/theme", None).await;
    assert_eq!(theme["theme"], "light");
}

#[tokio::test]
async fn history_can_be_opened_and_cleared() {
    let (app, _, _) = scripted_app(vec![Ok(Some(analysis_json("Queues")))]).await;
    upload_two_boards(&app).await;
    analyze(&app).await;
    send(&app, "POST", "/session/new", None).await;

    let (status, _) = send(
        &app,
        "POST",
        "/history/00000000-0000-0000-0000-000000000000/open",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = send(&app, "GET", "/history", None).await;
    let id = history["items"][0]["id"].as_str().unwrap().to_string();
    let (status, body) = send(&app, "POST", &format!("/history/{}/open", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["title"], "Queues");

    let (status, _) = send(&app, "DELETE", "/history", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, history) = send(&app, "GET", "/history", None).await;
    assert!(history["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn quiz_on_a_reopened_entry_keeps_its_thumbnail() {
    let (app, _, _) = scripted_app(vec![
        Ok(Some(analysis_json("Queues"))),
        Ok(Some(quiz_json())),
    ])
    .await;
    upload_two_boards(&app).await;
    analyze(&app).await;
    let (_, history) = send(&app, "GET", "/history", None).await;
    let thumbnail = history["items"][0]["thumbnail"].clone();
    assert!(thumbnail.as_str().unwrap().starts_with("data:image/png;base64,"));

    send(&app, "POST", "/session/new", None).await;
    let id = history["items"][0]["id"].as_str().unwrap().to_string();
    send(&app, "POST", &format!("/history/{}/open", id), None).await;
    let (status, _) = send(&app, "POST", "/quiz", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = send(&app, "GET", "/history", None).await;
    assert_eq!(history["items"].as_array().unwrap().len(), 1);
    assert_eq!(history["items"][0]["thumbnail"], thumbnail);
}

#[tokio::test]
async fn theme_can_be_set_explicitly() {
    let (app, _, store) = scripted_app(vec![]).await;
    let (status, body) = send(&app, "PUT", "/theme", Some(json!({"theme": "dark"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], "dark");
    assert_eq!(
        store.get("boardvision_theme").await.unwrap().as_deref(),
        Some("\"dark\"")
    );
}

//=========================================================================================
// Review
//=========================================================================================

#[tokio::test]
async fn review_walks_the_saved_deck() {
    let (app, _, _) = scripted_app(vec![Ok(Some(analysis_json("Hashing")))]).await;
    let (status, _) = send(&app, "GET", "/review", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    upload_two_boards(&app).await;
    analyze(&app).await;
    send(&app, "POST", "/flashcards", Some(json!({}))).await;

    let (status, body) = send(&app, "POST", "/review", Some(json!({"deck": "Hashing"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["review"]["status"], "in_progress");
    assert_eq!(body["review"]["total"], 3);

    let (_, body) = send(&app, "POST", "/review/flip", None).await;
    assert_eq!(body["review"]["flipped"], true);
    for _ in 0..3 {
        send(&app, "POST", "/review/next", None).await;
    }
    let (_, body) = send(&app, "GET", "/review", None).await;
    assert_eq!(body["review"]["status"], "finished");

    let (_, body) = send(&app, "POST", "/review/restart", None).await;
    assert_eq!(body["review"]["position"], 0);

    let (status, _) = send(&app, "POST", "/review/shuffle", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
