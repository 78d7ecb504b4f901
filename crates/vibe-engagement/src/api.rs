//! HTTP API for the engagement service.
//!
//! Serves session tracking, the pathway classifier and hint generator, the
//! teacher dashboard, the to-do list, the snippet catalog and code analysis.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Liveness and live session count
//! - `POST /api/sessions` - Start a session
//! - `GET /api/sessions` - List sessions
//! - `GET /api/sessions/:id` - Get a session
//! - `DELETE /api/sessions/:id` - Discard a session
//! - `POST /api/sessions/:id/events` - Record an interaction event
//! - `POST /api/sessions/:id/tick` - Run one simulation tick now
//! - `POST /api/classify` - Classify a metrics body
//! - `POST /api/hint` - Pick a hint for a metrics body
//! - `GET /api/dashboard/...` - Teacher dashboard data
//! - `GET|POST /api/tasks`, `PATCH|DELETE /api/tasks/:id` - To-do list
//! - `GET /api/snippets`, `GET /api/snippets/:chapter/:name` - Snippets
//! - `POST /api/analyze` - Structured code analysis
//! - `GET /ws` - WebSocket event stream
//!
//! # Example
//!
//! ```no_run
//! use vibe_engagement::{create_router, AppState, Config};
//!
//! # async fn example() {
//! let state = AppState::new(Config::default());
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use vibe_llm::{
    analysis_prompt, code_analysis_schema, CodeAnalysisResult, LlmError, OpenAiModel,
    StructuredOutputClient, StructuredRequest,
};

use crate::config::Config;
use crate::dashboard::{
    Chapter, DashboardRepository, MetricSummary, MockDashboard, PathwayShare, StatusFilter,
    Student, Timeframe,
};
use crate::error::VibeError;
use crate::hint::{generate_hint, AdaptiveHint};
use crate::metrics::{EngagementMetrics, EventKind};
use crate::pathway::{classify, LearningPathway};
use crate::session::{SessionSnapshot, SessionStore, SessionUpdate};
use crate::snippets::{Snippet, SnippetCatalog, SnippetSummary};
use crate::tasks::{Task, TaskFilter, TaskList, TaskStats};
use crate::ticker::MetricsSimulator;
use crate::websocket::{ws_handler, EngagementEvent, EventBroadcaster};

/// Chapter the dashboard scopes to when none is given.
const DEFAULT_DASHBOARD_CHAPTER: &str = "overview";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Number of live sessions.
    pub sessions: usize,
    /// Service version.
    pub version: String,
}

/// Request body for starting a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Chapter the learner is reading.
    pub chapter_id: String,
    /// Section within the chapter.
    pub section_id: String,
    /// Whether the background ticker drives this session.
    #[serde(default = "default_simulate")]
    pub simulate: bool,
}

const fn default_simulate() -> bool {
    true
}

/// Request body for recording an interaction event.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventRequest {
    /// Event kind, e.g. `execution_success`.
    pub event: String,
}

/// Response body for the classify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    /// The computed pathway.
    pub pathway: LearningPathway,
    /// Display label of the pathway.
    pub label: String,
    /// What the pathway means.
    pub description: String,
    /// Successful runs over all runs.
    pub success_rate: f64,
}

/// Request body for the hint endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    /// The learner's metrics.
    #[serde(default)]
    pub metrics: EngagementMetrics,
    /// Chapter the learner is reading.
    #[serde(default)]
    pub chapter_id: String,
    /// Section within the chapter.
    #[serde(default)]
    pub section_id: String,
}

/// Query parameters for the dashboard endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    /// Chapter id; defaults to `overview`.
    pub chapter: Option<String>,
    /// Status filter; defaults to `all`.
    pub filter: Option<String>,
    /// Name search, students only.
    pub search: Option<String>,
    /// Metric timeframe, metrics only; defaults to `week`.
    pub timeframe: Option<String>,
}

impl DashboardQuery {
    fn chapter(&self) -> &str {
        self.chapter
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_DASHBOARD_CHAPTER)
    }

    fn filter(&self) -> Result<StatusFilter, VibeError> {
        self.filter
            .as_deref()
            .map_or(Ok(StatusFilter::default()), str::parse)
    }

    fn timeframe(&self) -> Result<Timeframe, VibeError> {
        self.timeframe
            .as_deref()
            .map_or(Ok(Timeframe::default()), str::parse)
    }
}

/// Query parameters for the task list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    /// `all`, `active` or `completed`.
    pub filter: Option<String>,
}

/// Response body for the task list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    /// Tasks passing the filter, oldest first.
    pub tasks: Vec<Task>,
    /// Counts over every task.
    pub stats: TaskStats,
    /// The filter that was applied.
    pub filter: String,
}

/// Request body for adding a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// Task text.
    pub text: String,
}

/// Request body for updating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    /// Replacement text.
    pub text: Option<String>,
    /// New completion state.
    pub completed: Option<bool>,
}

/// Query parameters for the snippet listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnippetQuery {
    /// Restrict the listing to one chapter.
    pub chapter: Option<u32>,
}

/// Request body for the analyze endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Code to analyze.
    pub code: String,
    /// Language of the code.
    pub language: String,
    /// Model identifier; defaults to the configured model.
    #[serde(default)]
    pub model: Option<String>,
    /// Per-request API key; overrides the server's key.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// Mutable parts are wrapped for sharing across handlers and the ticker.
/// Handlers that need both locks take `simulator` before `sessions`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,
    /// Live engagement sessions.
    pub sessions: Arc<Mutex<SessionStore>>,
    /// Random source for the demo ticker.
    pub simulator: Arc<Mutex<MetricsSimulator>>,
    /// The to-do list.
    pub tasks: Arc<Mutex<TaskList>>,
    /// Teacher dashboard data.
    pub dashboard: Arc<dyn DashboardRepository>,
    /// Loaded chapter snippets.
    pub snippets: Arc<SnippetCatalog>,
    /// Event fan-out to WebSocket clients.
    pub broadcaster: EventBroadcaster,
    /// Server-side code analyzer, present when an API key is configured.
    pub analyzer: Option<StructuredOutputClient>,
}

impl AppState {
    /// Creates a new `AppState` with the given configuration.
    ///
    /// Starts with no sessions, an empty to-do list, an empty snippet
    /// catalog, the mock dashboard and no analyzer.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let simulator =
            MetricsSimulator::new(config.simulation.clone(), config.tick_interval_secs);
        Self {
            config,
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            simulator: Arc::new(Mutex::new(simulator)),
            tasks: Arc::new(Mutex::new(TaskList::new())),
            dashboard: Arc::new(MockDashboard::new()),
            snippets: Arc::new(SnippetCatalog::new()),
            broadcaster: EventBroadcaster::default(),
            analyzer: None,
        }
    }

    /// Replaces the to-do list, e.g. with one loaded from disk.
    #[must_use]
    pub fn with_tasks(mut self, tasks: TaskList) -> Self {
        self.tasks = Arc::new(Mutex::new(tasks));
        self
    }

    /// Replaces the snippet catalog.
    #[must_use]
    pub fn with_snippets(mut self, snippets: SnippetCatalog) -> Self {
        self.snippets = Arc::new(snippets);
        self
    }

    /// Replaces the dashboard repository.
    #[must_use]
    pub fn with_dashboard(mut self, dashboard: impl DashboardRepository + 'static) -> Self {
        self.dashboard = Arc::new(dashboard);
        self
    }

    /// Sets the server-side code analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: StructuredOutputClient) -> Self {
        self.analyzer = Some(analyzer);
        self
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// The request was malformed.
    BadRequest(String),
    /// The addressed resource does not exist.
    NotFound(String),
    /// The LLM provider failed.
    Upstream(String),
    /// The analyzer has no API key.
    Unavailable(String),
    /// Anything else.
    Internal(String),
}

impl From<VibeError> for ApiError {
    fn from(err: VibeError) -> Self {
        let message = err.to_string();
        if err.is_not_found() {
            return Self::NotFound(message);
        }
        match err {
            VibeError::InvalidInput(_) => Self::BadRequest(message),
            VibeError::Llm(LlmError::MissingApiKey) => Self::Unavailable(message),
            VibeError::Llm(e) if e.is_caller_error() => Self::BadRequest(message),
            VibeError::Llm(_) => Self::Upstream(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        VibeError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Upstream(msg) => {
                warn!(error = %msg, "LLM request failed");
                (StatusCode::BAD_GATEWAY, msg)
            }
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => {
                warn!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// # Returns
///
/// An axum `Router` configured with:
/// - All API routes under `/api`
/// - The WebSocket stream at `/ws`
/// - CORS middleware allowing any origin
/// - Tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handle_health))
        .route(
            "/sessions",
            post(handle_create_session).get(handle_list_sessions),
        )
        .route(
            "/sessions/:id",
            get(handle_get_session).delete(handle_delete_session),
        )
        .route("/sessions/:id/events", post(handle_record_event))
        .route("/sessions/:id/tick", post(handle_tick_session))
        .route("/classify", post(handle_classify))
        .route("/hint", post(handle_hint))
        .route("/dashboard/chapters", get(handle_chapters))
        .route("/dashboard/students", get(handle_students))
        .route("/dashboard/students/:id", get(handle_student))
        .route("/dashboard/pathways", get(handle_pathways))
        .route("/dashboard/metrics", get(handle_metrics))
        .route("/tasks", get(handle_list_tasks).post(handle_create_task))
        .route(
            "/tasks/:id",
            patch(handle_update_task).delete(handle_delete_task),
        )
        .route("/tasks/:id/toggle", post(handle_toggle_task))
        .route("/snippets", get(handle_list_snippets))
        .route("/snippets/:chapter/:name", get(handle_get_snippet))
        .route("/analyze", post(handle_analyze));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Health & Sessions
// ============================================================================

/// Handler for `GET /api/health`.
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.lock().await.len();
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for `POST /api/sessions`.
async fn handle_create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let snapshot = state.sessions.lock().await.create(
        &request.chapter_id,
        &request.section_id,
        request.simulate,
    )?;

    state
        .broadcaster
        .send(EngagementEvent::session_started(snapshot.clone()));
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Handler for `GET /api/sessions`.
async fn handle_list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSnapshot>> {
    Json(state.sessions.lock().await.list())
}

/// Handler for `GET /api/sessions/:id`.
async fn handle_get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.lock().await.get(&id)?))
}

/// Handler for `DELETE /api/sessions/:id`.
async fn handle_delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state.sessions.lock().await.remove(&id)?;
    state
        .broadcaster
        .send(EngagementEvent::session_closed(snapshot.clone()));
    Ok(Json(snapshot))
}

/// Handler for `POST /api/sessions/:id/events`.
async fn handle_record_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<RecordEventRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let event: EventKind = request.event.parse()?;
    let update = state.sessions.lock().await.record_event(&id, event)?;

    info!(session = %id, event = %event, "Recorded event");
    Ok(Json(publish_update(&state.broadcaster, update)))
}

/// Handler for `POST /api/sessions/:id/tick`.
async fn handle_tick_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let update = {
        let mut simulator = state.simulator.lock().await;
        let mut sessions = state.sessions.lock().await;
        sessions.tick(&id, &mut simulator)?
    };
    Ok(Json(publish_update(&state.broadcaster, update)))
}

/// Broadcasts a session update and returns its snapshot.
fn publish_update(broadcaster: &EventBroadcaster, update: SessionUpdate) -> SessionSnapshot {
    if let Some(change) = update.pathway_change {
        broadcaster.send(EngagementEvent::pathway_changed(update.snapshot.id, change));
    }
    broadcaster.send(EngagementEvent::metrics_updated(update.snapshot.clone()));
    update.snapshot
}

// ============================================================================
// Classifier & Hints
// ============================================================================

/// Handler for `POST /api/classify`.
async fn handle_classify(Json(metrics): Json<EngagementMetrics>) -> Json<ClassifyResponse> {
    let pathway = classify(&metrics);
    Json(ClassifyResponse {
        pathway,
        label: pathway.label().to_string(),
        description: pathway.description().to_string(),
        success_rate: metrics.success_rate(),
    })
}

/// Handler for `POST /api/hint`.
async fn handle_hint(Json(request): Json<HintRequest>) -> Json<AdaptiveHint> {
    Json(generate_hint(
        &request.metrics,
        &request.chapter_id,
        &request.section_id,
    ))
}

// ============================================================================
// Dashboard
// ============================================================================

/// Handler for `GET /api/dashboard/chapters`.
async fn handle_chapters(State(state): State<Arc<AppState>>) -> Json<Vec<Chapter>> {
    Json(state.dashboard.chapters())
}

/// Handler for `GET /api/dashboard/students`.
async fn handle_students(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let filter = query.filter()?;
    let students = match &query.search {
        Some(search) => state
            .dashboard
            .search_students(query.chapter(), filter, search)?,
        None => state.dashboard.students(query.chapter(), filter),
    };
    Ok(Json(students))
}

/// Handler for `GET /api/dashboard/students/:id`.
async fn handle_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Student>, ApiError> {
    state
        .dashboard
        .student(&id)
        .map(Json)
        .ok_or_else(|| VibeError::student_not_found(id).into())
}

/// Handler for `GET /api/dashboard/pathways`.
async fn handle_pathways(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<PathwayShare>>, ApiError> {
    let filter = query.filter()?;
    Ok(Json(
        state.dashboard.pathway_distribution(query.chapter(), filter),
    ))
}

/// Handler for `GET /api/dashboard/metrics`.
async fn handle_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<MetricSummary>>, ApiError> {
    let filter = query.filter()?;
    let timeframe = query.timeframe()?;
    Ok(Json(state.dashboard.metric_summaries(
        query.chapter(),
        timeframe,
        filter,
    )))
}

// ============================================================================
// Tasks
// ============================================================================

/// Handler for `GET /api/tasks`.
async fn handle_list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let filter: TaskFilter = query
        .filter
        .as_deref()
        .map_or(Ok(TaskFilter::default()), str::parse)?;
    let tasks = state.tasks.lock().await;
    Ok(Json(TaskListResponse {
        tasks: tasks.filtered(filter),
        stats: tasks.stats(),
        filter: filter.to_string(),
    }))
}

/// Handler for `POST /api/tasks`.
async fn handle_create_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = update_tasks(&state, |tasks| tasks.add(&request.text)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for `PATCH /api/tasks/:id`.
async fn handle_update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    if request.text.is_none() && request.completed.is_none() {
        return Err(ApiError::BadRequest(
            "Nothing to update: supply text or completed".to_string(),
        ));
    }

    let task = update_tasks(&state, |tasks| {
        let mut task = tasks.get(id)?.clone();
        if let Some(text) = &request.text {
            task = tasks.edit(id, text)?;
        }
        if let Some(completed) = request.completed {
            task = tasks.set_completed(id, completed)?;
        }
        Ok(task)
    })
    .await?;
    Ok(Json(task))
}

/// Handler for `POST /api/tasks/:id/toggle`.
async fn handle_toggle_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(update_tasks(&state, |tasks| tasks.toggle(id)).await?))
}

/// Handler for `DELETE /api/tasks/:id`.
async fn handle_delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(update_tasks(&state, |tasks| tasks.delete(id)).await?))
}

/// Applies a mutation to the to-do list and persists it.
///
/// The mutation runs on a copy that replaces the live list only after the
/// save succeeds, so a failed write leaves memory matching the file. The
/// lock is held across the save so concurrent writes land in order.
async fn update_tasks<F>(state: &AppState, mutate: F) -> Result<Task, ApiError>
where
    F: FnOnce(&mut TaskList) -> crate::error::Result<Task>,
{
    let mut tasks = state.tasks.lock().await;
    let mut updated = tasks.clone();
    let task = mutate(&mut updated)?;

    if let Err(e) = updated.save(FsPath::new(&state.config.tasks_file)).await {
        state
            .broadcaster
            .send(EngagementEvent::error(format!("Failed to save tasks: {e}")));
        return Err(e.into());
    }

    *tasks = updated;
    Ok(task)
}

// ============================================================================
// Snippets
// ============================================================================

/// Handler for `GET /api/snippets`.
async fn handle_list_snippets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SnippetQuery>,
) -> Json<Vec<SnippetSummary>> {
    let snippets = match query.chapter {
        Some(chapter) => state.snippets.chapter(chapter),
        None => state.snippets.list(),
    };
    Json(snippets)
}

/// Handler for `GET /api/snippets/:chapter/:name`.
async fn handle_get_snippet(
    State(state): State<Arc<AppState>>,
    Path((chapter, name)): Path<(u32, String)>,
) -> Result<Json<Snippet>, ApiError> {
    Ok(Json(state.snippets.get(chapter, &name)?.clone()))
}

// ============================================================================
// Code Analysis
// ============================================================================

/// Handler for `POST /api/analyze`.
///
/// A non-blank `apiKey` in the body takes precedence over the server's
/// analyzer.
async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<CodeAnalysisResult>, ApiError> {
    let llm = &state.config.llm;
    let model: OpenAiModel = match request.model.as_deref() {
        Some(model) => model.parse()?,
        None => llm.default_model,
    };

    if request.code.trim().is_empty() {
        return Err(VibeError::invalid_input("Code cannot be empty").into());
    }
    if request.language.trim().is_empty() {
        return Err(VibeError::invalid_input("Language cannot be empty").into());
    }

    let client = match request.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => StructuredOutputClient::new(
            key,
            llm.base_url.as_str(),
            Duration::from_secs(llm.timeout_secs),
        )?,
        None => state.analyzer.clone().ok_or(LlmError::MissingApiKey)?,
    };

    info!(
        model = %model,
        language = %request.language,
        code_len = request.code.len(),
        "Analyzing code"
    );

    let structured = StructuredRequest::new(
        analysis_prompt(request.language.trim(), &request.code),
        code_analysis_schema(),
    )
    .with_model(model)
    .with_temperature(llm.temperature)
    .with_max_tokens(llm.max_tokens);

    let result = client
        .get_structured_output::<CodeAnalysisResult>(&structured)
        .await?;
    Ok(Json(result))
}

// ============================================================================
// Tests
// ============================================================================
