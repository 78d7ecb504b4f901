//! Integration tests for the HTTP API over a real socket.
//!
//! Each test starts the router on a free local port and talks to it with
//! `reqwest`, the way the book's frontend does.

use std::net::TcpListener;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use vibe_engagement::{create_router, AppState, Config, TaskList};

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Config with a tasks file unique to one test.
fn test_config(name: &str) -> Config {
    let tasks_file = std::env::temp_dir()
        .join(format!("vibe_it_{name}_{}.json", std::process::id()))
        .to_string_lossy()
        .into_owned();
    Config {
        tasks_file,
        ..Config::default()
    }
}

/// Spawns the test server and returns the API base URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{addr}/api"), handle)
}

async fn get_json(http: &reqwest::Client, url: &str) -> (StatusCode, Value) {
    let response = http.get(url).send().await.expect("Request failed");
    let status = response.status();
    (status, response.json().await.expect("Body is not JSON"))
}

async fn post_json(http: &reqwest::Client, url: &str, body: Value) -> (StatusCode, Value) {
    let response = http.post(url).json(&body).send().await.expect("Request failed");
    let status = response.status();
    (status, response.json().await.expect("Body is not JSON"))
}

// ============================================================================
// Health & Sessions
// ============================================================================

#[tokio::test]
async fn test_health_counts_sessions() {
    let (base, _handle) = spawn_test_server(AppState::new(test_config("health"))).await;
    let http = reqwest::Client::new();

    let (status, json) = get_json(&http, &format!("{base}/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sessions"], 0);

    let (status, _) = post_json(
        &http,
        &format!("{base}/sessions"),
        json!({ "chapterId": "chapter_01", "sectionId": "intro" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = get_json(&http, &format!("{base}/health")).await;
    assert_eq!(json["sessions"], 1);
}

#[tokio::test]
async fn test_recorded_events_drive_classification() {
    let (base, _handle) = spawn_test_server(AppState::new(test_config("events"))).await;
    let http = reqwest::Client::new();

    let (_, session) = post_json(
        &http,
        &format!("{base}/sessions"),
        json!({ "chapterId": "chapter_02", "sectionId": "first-prompt", "simulate": false }),
    )
    .await;
    let id = session["id"].as_str().expect("Missing id");

    for event in ["execution_success", "execution_success", "execution_failure", "ai_prompt"] {
        let (status, _) = post_json(
            &http,
            &format!("{base}/sessions/{id}/events"),
            json!({ "event": event }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = get_json(&http, &format!("{base}/sessions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metrics"]["executionSuccess"], 2);
    assert_eq!(json["metrics"]["executionFailures"], 1);
    assert_eq!(json["metrics"]["aiPrompts"], 1);
    // Confidence stays at its 0.5 default, below every promotion threshold
    assert_eq!(json["metrics"]["learningPathway"], "beginner");

    let (status, json) = post_json(&http, &format!("{base}/classify"), json["metrics"].clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pathway"], "beginner");
}

#[tokio::test]
async fn test_classify_and_hint_without_session() {
    let (base, _handle) = spawn_test_server(AppState::new(test_config("classify"))).await;
    let http = reqwest::Client::new();

    let metrics = json!({
        "executionSuccess": 9,
        "executionFailures": 1,
        "confidenceScore": 0.9,
        "aiPrompts": 2
    });

    let (status, json) = post_json(&http, &format!("{base}/classify"), metrics.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pathway"], "ninja");
    assert_eq!(json["label"], "Ninja");

    let (status, json) = post_json(&http, &format!("{base}/hint"), json!({ "metrics": metrics })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["kind"].is_string());
    assert!(json["text"].is_string());
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn test_dashboard_views() {
    let (base, _handle) = spawn_test_server(AppState::new(test_config("dashboard"))).await;
    let http = reqwest::Client::new();

    let (status, json) = get_json(&http, &format!("{base}/dashboard/chapters")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!json.as_array().expect("chapters array").is_empty());

    let (status, json) = get_json(&http, &format!("{base}/dashboard/students")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().expect("students array").len(), 6);

    let (status, json) = get_json(&http, &format!("{base}/dashboard/pathways")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().expect("pathways array").len(), 3);

    let (status, _) = get_json(&http, &format!("{base}/dashboard/students?filter=sleeping")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Tasks
// ============================================================================

#[tokio::test]
async fn test_tasks_survive_restart() {
    let config = test_config("tasks");
    let tasks_file = config.tasks_file.clone();
    let (base, handle) = spawn_test_server(AppState::new(config.clone())).await;
    let http = reqwest::Client::new();

    let mut ids = Vec::new();
    for text in ["Read chapter 1", "Try the sandbox"] {
        let (status, task) = post_json(&http, &format!("{base}/tasks"), json!({ "text": text })).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(task["id"].as_u64().expect("Missing id"));
    }
    // Ids are creation timestamps, strictly increasing
    assert!(ids[0] < ids[1]);

    let toggle_url = format!("{base}/tasks/{}/toggle", ids[0]);
    let (status, json) = post_json(&http, &toggle_url, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["completed"], true);
    handle.abort();

    // A fresh server picks up the saved list
    let tasks = TaskList::load(std::path::Path::new(&tasks_file))
        .await
        .expect("Failed to load tasks");
    let state = AppState::new(config).with_tasks(tasks);
    let (base, _handle) = spawn_test_server(state).await;

    let (status, json) = get_json(&http, &format!("{base}/tasks?filter=completed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["total"], 2);
    assert_eq!(json["stats"]["completed"], 1);
    assert_eq!(json["tasks"][0]["text"], "Read chapter 1");

    std::fs::remove_file(&tasks_file).ok();
}

// ============================================================================
// Analyzer
// ============================================================================

#[tokio::test]
async fn test_analyze_without_key_is_unavailable() {
    let (base, _handle) = spawn_test_server(AppState::new(test_config("analyze"))).await;
    let http = reqwest::Client::new();

    let (status, json) = post_json(
        &http,
        &format!("{base}/analyze"),
        json!({ "code": "print('hi')", "language": "python" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());
}
