//! In-process chat-completions server used by the client and agent tests.

#![allow(clippy::expect_used)]

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// Request bodies received by the mock, in arrival order.
pub type Captured = Arc<Mutex<Vec<Value>>>;

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<Vec<Value>>>,
    captured: Captured,
}

/// Starts a server that answers with `responses` in order, repeating the last
/// one once the queue is down to a single entry.
pub async fn spawn_mock(responses: Vec<Value>) -> (String, Captured) {
    let captured = Captured::default();
    let state = MockState {
        responses: Arc::new(Mutex::new(responses)),
        captured: Arc::clone(&captured),
    };
    let router = Router::new()
        .route("/v1/chat/completions", post(reply))
        .with_state(state);

    (serve(router).await, captured)
}

/// Starts a server that always fails with `status`.
pub async fn spawn_failing(status: u16, body: &'static str) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move || async move {
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            )
        }),
    );
    serve(router).await
}

/// Builds a completion whose only choice calls `name` with `arguments`.
pub fn tool_call_response(name: &str, arguments: &str) -> Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": name, "arguments": arguments }
                }]
            }
        }]
    })
}

/// Builds a completion whose only choice is plain assistant text.
pub fn text_response(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

async fn reply(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.captured.lock().await.push(body);

    let mut responses = state.responses.lock().await;
    let next = if responses.len() > 1 {
        responses.remove(0)
    } else {
        responses.first().cloned().unwrap_or(Value::Null)
    };
    Json(next)
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{addr}/v1")
}
