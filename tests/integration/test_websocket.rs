//! Integration tests for WebSocket engagement event streaming.
//!
//! These tests run the real server on a local port and validate connection
//! handling, event broadcasting and concurrent client support.

use std::net::TcpListener;
use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;
use vibe_engagement::{create_router, AppState, Config, EngagementEvent};

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server and returns the WebSocket URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let ws_url = format!("ws://{addr}/ws");

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (ws_url, handle)
}

/// Connects a WebSocket client to the given URL.
async fn connect_client(url: &str) -> WsClient {
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next text message and parses it as an `EngagementEvent`.
/// Automatically handles ping frames by responding with pong.
async fn receive_event(client: &mut WsClient) -> EngagementEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

/// Converts the WebSocket URL to the HTTP API base URL.
fn api_url(ws_url: &str) -> String {
    ws_url.replace("ws://", "http://").replace("/ws", "/api")
}

// ============================================================================
// Connection Tests
// ============================================================================

/// Tests that a WebSocket client receives a connected event on connection.
#[tokio::test]
async fn test_client_receives_connected_event_on_connect() {
    let state = AppState::new(Config::default());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    let event = receive_event(&mut client).await;

    match event {
        EngagementEvent::Connected(payload) => assert!(payload.sessions.is_empty()),
        other => panic!("Expected Connected event, got: {other:?}"),
    }
}

/// Tests that the connected event lists the live sessions.
#[tokio::test]
async fn test_connected_event_contains_live_sessions() {
    let state = AppState::new(Config::default());
    {
        let mut sessions = state.sessions.lock().await;
        sessions
            .create("chapter_01", "intro", true)
            .expect("Failed to create session");
        sessions
            .create("chapter_02", "first-prompt", false)
            .expect("Failed to create session");
    }
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;

    if let EngagementEvent::Connected(payload) = receive_event(&mut client).await {
        assert_eq!(payload.sessions.len(), 2);
        assert_eq!(payload.sessions[0].chapter_id, "chapter_01");
        assert_eq!(payload.sessions[1].section_id, "first-prompt");
    } else {
        panic!("Expected Connected event");
    }
}

// ============================================================================
// Multiple Client Tests
// ============================================================================

/// Tests that multiple clients can connect concurrently.
#[tokio::test]
async fn test_multiple_clients_can_connect() {
    let state = AppState::new(Config::default());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&ws_url).await;
    let mut client2 = connect_client(&ws_url).await;
    let mut client3 = connect_client(&ws_url).await;

    assert!(matches!(
        receive_event(&mut client1).await,
        EngagementEvent::Connected(_)
    ));
    assert!(matches!(
        receive_event(&mut client2).await,
        EngagementEvent::Connected(_)
    ));
    assert!(matches!(
        receive_event(&mut client3).await,
        EngagementEvent::Connected(_)
    ));
}

// ============================================================================
// Event Broadcast Tests
// ============================================================================

/// Tests that events are broadcast to all connected clients.
#[tokio::test]
async fn test_events_broadcast_to_all_clients() {
    let state = AppState::new(Config::default());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&ws_url).await;
    let mut client2 = connect_client(&ws_url).await;

    // Consume connected events
    receive_event(&mut client1).await;
    receive_event(&mut client2).await;

    broadcaster.send(EngagementEvent::error("ticker stalled"));

    for client in [&mut client1, &mut client2] {
        match receive_event(client).await {
            EngagementEvent::Error(payload) => assert_eq!(payload.message, "ticker stalled"),
            other => panic!("Expected Error event, got: {other:?}"),
        }
    }
}

// ============================================================================
// API Integration Tests
// ============================================================================

/// Tests that the session lifecycle over HTTP is mirrored on the socket.
#[tokio::test]
async fn test_session_lifecycle_triggers_websocket_events() {
    let state = AppState::new(Config::default());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    let http = reqwest::Client::new();
    let base = api_url(&ws_url);

    let created: serde_json::Value = http
        .post(format!("{base}/sessions"))
        .json(&serde_json::json!({
            "chapterId": "chapter_03",
            "sectionId": "task-form",
            "simulate": false
        }))
        .send()
        .await
        .expect("Failed to create session")
        .json()
        .await
        .expect("Failed to parse session");
    let id = created["id"].as_str().expect("Missing id").to_string();

    match receive_event(&mut client).await {
        EngagementEvent::SessionStarted(payload) => {
            assert_eq!(payload.session.id.to_string(), id);
            assert_eq!(payload.session.chapter_id, "chapter_03");
        }
        other => panic!("Expected SessionStarted event, got: {other:?}"),
    }

    let response = http
        .post(format!("{base}/sessions/{id}/tick"))
        .send()
        .await
        .expect("Failed to tick session");
    assert!(response.status().is_success());

    // A single tick from beginner defaults never reaches another tier
    match receive_event(&mut client).await {
        EngagementEvent::MetricsUpdated(payload) => {
            assert_eq!(payload.session.ticks, 1);
            assert_eq!(payload.session.metrics.time_spent(), 5);
        }
        other => panic!("Expected MetricsUpdated event, got: {other:?}"),
    }

    let response = http
        .post(format!("{base}/sessions/{id}/events"))
        .json(&serde_json::json!({ "event": "concept_extension" }))
        .send()
        .await
        .expect("Failed to record event");
    assert!(response.status().is_success());

    match receive_event(&mut client).await {
        EngagementEvent::MetricsUpdated(payload) => {
            assert_eq!(payload.session.metrics.concept_extensions(), 1);
        }
        other => panic!("Expected MetricsUpdated event, got: {other:?}"),
    }

    let response = http
        .delete(format!("{base}/sessions/{id}"))
        .send()
        .await
        .expect("Failed to delete session");
    assert!(response.status().is_success());

    assert!(matches!(
        receive_event(&mut client).await,
        EngagementEvent::SessionClosed(_)
    ));
}

// ============================================================================
// Disconnection Tests
// ============================================================================

/// Tests that client can cleanly disconnect.
#[tokio::test]
async fn test_client_can_disconnect() {
    let state = AppState::new(Config::default());
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await; // Consume connected event

    client
        .close(None)
        .await
        .expect("Failed to close connection");
}

/// Tests that server continues after client disconnects.
#[tokio::test]
async fn test_server_continues_after_client_disconnect() {
    let state = AppState::new(Config::default());
    let broadcaster = state.broadcaster.clone();
    let (ws_url, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&ws_url).await;
    receive_event(&mut client1).await;
    client1.close(None).await.ok();
    drop(client1);

    // Give server time to process disconnect
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut client2 = connect_client(&ws_url).await;
    assert!(matches!(
        receive_event(&mut client2).await,
        EngagementEvent::Connected(_)
    ));

    broadcaster.send(EngagementEvent::error("still here"));
    assert!(matches!(
        receive_event(&mut client2).await,
        EngagementEvent::Error(_)
    ));
}
