//! Vibe Engagement
//!
//! Tracks how learners engage with the book's exercises, classifies them
//! into learning pathways, picks adaptive hints, and serves the HTTP API and
//! WebSocket events.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod hint;
pub mod metrics;
pub mod pathway;
pub mod session;
pub mod snippets;
pub mod tasks;
pub mod ticker;
pub mod websocket;

pub use api::{
    create_router, AnalyzeRequest, AppState, ClassifyResponse, CreateSessionRequest,
    CreateTaskRequest, ErrorResponse, HealthResponse, HintRequest, RecordEventRequest,
    TaskListResponse, UpdateTaskRequest,
};
pub use config::{Config, LlmConfig, SimulationConfig};
pub use dashboard::{
    Chapter, DashboardRepository, MetricSummary, MetricUnit, MockDashboard, PathwayShare,
    StatusFilter, Student, Timeframe, Trend,
};
pub use error::{Result, VibeError};
pub use hint::{generate_hint, select_hint, AdaptiveHint, HintKind};
pub use metrics::{EngagementMetrics, EventKind, MetricsRecord, PathwayTransition};
pub use pathway::{classify, LearningPathway};
pub use session::{PathwayChange, SessionSnapshot, SessionStore, SessionUpdate};
pub use snippets::{Snippet, SnippetCatalog, SnippetLanguage, SnippetSummary, MAX_SNIPPET_SIZE};
pub use tasks::{Task, TaskFilter, TaskList, TaskStats};
pub use ticker::{spawn_ticker, MetricsSimulator, TickOutcome};
pub use websocket::{EngagementEvent, EventBroadcaster};
