//! WebSocket event types and broadcasting for live engagement updates.
//!
//! Events are broadcast to all connected clients as sessions start, tick,
//! change pathway and close.
//!
//! # Event Types
//!
//! - `connected` - Sent when a client connects, includes every live session
//! - `session_started` - A session was created
//! - `metrics_updated` - A session's metrics changed
//! - `pathway_changed` - A session moved to another pathway
//! - `session_closed` - A session was discarded
//! - `error` - A server-side write failed, such as saving the to-do list
//!
//! # Example
//!
//! ```no_run
//! use vibe_engagement::websocket::{EngagementEvent, EventBroadcaster};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(EngagementEvent::error("Failed to save tasks"));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {}", event.event_name());
//! }
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::session::{PathwayChange, SessionSnapshot};

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    /// Every live session, oldest first.
    pub sessions: Vec<SessionSnapshot>,
}

/// Payload for events carrying one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPayload {
    /// The session after the change.
    pub session: SessionSnapshot,
}

/// Payload for the `pathway_changed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayChangedPayload {
    /// The session whose pathway moved.
    pub session_id: Uuid,
    /// The change.
    pub change: PathwayChange,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// WebSocket events.
///
/// All events are serialized as JSON objects with "event" and "payload" fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum EngagementEvent {
    /// Sent when a client connects.
    Connected(ConnectedPayload),
    /// Sent when a session is created.
    SessionStarted(SessionPayload),
    /// Sent when a session's metrics change.
    MetricsUpdated(SessionPayload),
    /// Sent when a session's pathway changes.
    PathwayChanged(PathwayChangedPayload),
    /// Sent when a session is discarded.
    SessionClosed(SessionPayload),
    /// Sent when a server-side write fails.
    Error(ErrorPayload),
}

impl EngagementEvent {
    /// Creates a `Connected` event.
    #[must_use]
    pub const fn connected(sessions: Vec<SessionSnapshot>) -> Self {
        Self::Connected(ConnectedPayload { sessions })
    }

    /// Creates a `SessionStarted` event.
    #[must_use]
    pub const fn session_started(session: SessionSnapshot) -> Self {
        Self::SessionStarted(SessionPayload { session })
    }

    /// Creates a `MetricsUpdated` event.
    #[must_use]
    pub const fn metrics_updated(session: SessionSnapshot) -> Self {
        Self::MetricsUpdated(SessionPayload { session })
    }

    /// Creates a `PathwayChanged` event.
    #[must_use]
    pub const fn pathway_changed(session_id: Uuid, change: PathwayChange) -> Self {
        Self::PathwayChanged(PathwayChangedPayload { session_id, change })
    }

    /// Creates a `SessionClosed` event.
    #[must_use]
    pub const fn session_closed(session: SessionSnapshot) -> Self {
        Self::SessionClosed(SessionPayload { session })
    }

    /// Creates an `Error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::SessionStarted(_) => "session_started",
            Self::MetricsUpdated(_) => "metrics_updated",
            Self::PathwayChanged(_) => "pathway_changed",
            Self::SessionClosed(_) => "session_closed",
            Self::Error(_) => "error",
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Broadcasts events to all connected WebSocket clients.
///
/// Events are not persisted for disconnected clients.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<EngagementEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber.
    ///
    /// A subscriber that falls behind receives a `Lagged` error and misses
    /// some events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngagementEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event and returns how many subscribers will receive it.
    pub fn send(&self, event: EngagementEvent) -> usize {
        // Err only means there are no subscribers
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

/// Seconds between heartbeat pings.
const HEARTBEAT_SECS: u64 = 30;

/// Unanswered pings tolerated before the connection is closed.
const MAX_MISSED_PONGS: u8 = 3;

/// WebSocket upgrade handler for `GET /ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("New WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serializes `event` and writes it to the socket.
///
/// Returns `false` once the client is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &EngagementEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            // A payload that cannot be serialized is skipped, not fatal
            warn!(event = event.event_name(), error = %e, "Failed to serialize event");
            true
        }
    }
}

/// Sends `connected` with every live session.
async fn send_session_list(sender: &mut SplitSink<WebSocket, Message>, state: &AppState) -> bool {
    let sessions = state.sessions.lock().await.list();
    let count = sessions.len();
    let sent = send_event(sender, &EngagementEvent::connected(sessions)).await;
    if sent {
        debug!(sessions = count, "Sent session list");
    }
    sent
}

/// Handles a single WebSocket connection.
///
/// The client first receives `connected` with every live session, then each
/// broadcast event. A client that lags behind the channel is sent a fresh
/// `connected` so it can rebuild its view. Pings go out every 30 seconds and
/// the connection is closed after 3 unanswered ones.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no event falls in between
    let mut events = state.broadcaster.subscribe();

    if !send_session_list(&mut sender, &state).await {
        debug!("Client left before the session list was sent");
        return;
    }
    info!(clients = state.broadcaster.receiver_count(), "WebSocket client connected");

    let mut heartbeat = interval(Duration::from_secs(HEARTBEAT_SECS));
    // The first tick completes immediately
    heartbeat.tick().await;
    let mut unanswered_pings = 0u8;

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Pong(_))) => unanswered_pings = 0,
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                    debug!("Ignoring client message, the stream is one-way");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive failed");
                    break;
                }
            },

            event = events.recv() => match event {
                Ok(event) => {
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Client lagged, resending session list");
                    if !send_session_list(&mut sender, &state).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            _ = heartbeat.tick() => {
                if unanswered_pings >= MAX_MISSED_PONGS {
                    info!(unanswered_pings, "Client stopped answering pings, closing");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                unanswered_pings += 1;
            }
        }
    }

    info!("WebSocket client disconnected");
}

// ============================================================================
// Tests
// ============================================================================
