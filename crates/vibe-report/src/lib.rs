//! Vibe Report Generation
//!
//! Turns a finished engagement session into a report. Reports can be
//! serialized to JSON for programmatic access or rendered to Markdown for
//! teachers and learners.
//!
//! # Types
//!
//! - [`Report`] - The complete report for one session
//! - [`ReportSummary`] - Final pathway, success rate and counters
//! - [`TimelineEntry`] - A timestamped event from the session
//! - [`HintTally`] - How often each hint was shown
//! - [`Recommendation`] - A prioritized suggestion for the learner
//!
//! # Generators
//!
//! - [`ReportGenerator`] - Builds a [`Report`] from a [`ReportInput`]
//! - [`json::JsonGenerator`] - Generate JSON reports with compact or pretty formatting
//! - [`MarkdownGenerator`] - Generate human-readable Markdown reports
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use vibe_report::{json::JsonGenerator, ReportGenerator, ReportInput, ReportPathway, SessionMetrics};
//!
//! let now = Utc::now();
//! let input = ReportInput {
//!     session_id: "3f2a".to_string(),
//!     chapter_id: "chapter_03".to_string(),
//!     section_id: "task-form".to_string(),
//!     started_at: now,
//!     ended_at: now,
//!     ticks: 12,
//!     pathway: ReportPathway::Advanced,
//!     metrics: SessionMetrics::default(),
//!     pathway_changes: vec![],
//!     hints_shown: vec!["keep_experimenting".to_string()],
//! };
//!
//! let report = ReportGenerator::new(input).generate();
//! let json = JsonGenerator::new(&report).generate_pretty().unwrap();
//! assert!(json.contains("chapter_03"));
//! ```

mod generator;
pub mod json;
mod markdown;

pub use generator::{PathwayChangeInput, ReportGenerator, ReportInput};
pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Report Pathway (local copy to avoid cross-crate dependency)
// ============================================================================

/// Learning pathway a session ended on.
///
/// This is a local copy of `LearningPathway` from the engagement crate so
/// reports can be produced and read without the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPathway {
    /// Learning the fundamentals.
    #[default]
    Beginner,
    /// Comfortable with more complex concepts.
    Advanced,
    /// Building complete systems.
    Ninja,
}

impl ReportPathway {
    /// Returns the display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Advanced => "Advanced",
            Self::Ninja => "Ninja",
        }
    }
}

impl std::fmt::Display for ReportPathway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Session Metrics (local copy)
// ============================================================================

/// Final engagement counters of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    /// Seconds spent in the chapter.
    pub time_spent: u64,
    /// Code interactions.
    pub code_interactions: u64,
    /// AI prompts sent.
    pub ai_prompts: u64,
    /// Edits to generated code.
    pub code_modifications: u64,
    /// Successful runs.
    pub execution_success: u64,
    /// Failed runs.
    pub execution_failures: u64,
    /// Requests for assistant help.
    pub ai_assistance_requests: u64,
    /// Explorations beyond the exercise.
    pub concept_extensions: u64,
    /// Confidence in `[0, 1]`.
    pub confidence_score: f64,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self {
            time_spent: 0,
            code_interactions: 0,
            ai_prompts: 0,
            code_modifications: 0,
            execution_success: 0,
            execution_failures: 0,
            ai_assistance_requests: 0,
            concept_extensions: 0,
            confidence_score: 0.5,
        }
    }
}

impl SessionMetrics {
    /// Successful runs over all runs, `0.0` when nothing ran.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let total = self.execution_success + self.execution_failures;
        if total == 0 {
            0.0
        } else {
            self.execution_success as f64 / total as f64
        }
    }

    /// Total runs.
    #[must_use]
    pub const fn executions(&self) -> u64 {
        self.execution_success + self.execution_failures
    }
}

// ============================================================================
// Report
// ============================================================================

/// Complete session report.
///
/// Holds the summary, the timeline of the session, how often each hint was
/// shown, and recommendations for the learner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Session the report covers.
    pub session_id: String,

    /// Chapter the learner was reading.
    pub chapter_id: String,

    /// Section the learner was reading.
    pub section_id: String,

    /// High-level summary of the session.
    pub summary: ReportSummary,

    /// Chronological timeline of events.
    pub timeline: Vec<TimelineEntry>,

    /// Hints shown, most frequent first.
    pub hints: Vec<HintTally>,

    /// Prioritized recommendations for the learner.
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder() -> ReportBuilder {
        ReportBuilder::default()
    }

    /// Serializes the report to JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    /// Total number of hints shown.
    #[must_use]
    pub fn hints_shown(&self) -> usize {
        self.hints.iter().map(|h| h.count as usize).sum()
    }

    /// File stem for this report, e.g. `chapter_03-task-form-3f2a`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let short_id: String = self.session_id.chars().take(8).collect();
        sanitize_file_component(&format!(
            "{}-{}-{short_id}",
            self.chapter_id, self.section_id
        ))
    }
}

/// Replaces characters that are unsafe in file names with `_`.
fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// ReportBuilder
// ============================================================================

/// Builder for constructing [`Report`] instances.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    session_id: Option<String>,
    chapter_id: Option<String>,
    section_id: Option<String>,
    summary: Option<ReportSummary>,
    timeline: Vec<TimelineEntry>,
    hints: Vec<HintTally>,
    recommendations: Vec<Recommendation>,
}

impl ReportBuilder {
    /// Sets the session id.
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Sets the chapter and section.
    #[must_use]
    pub fn location(mut self, chapter_id: impl Into<String>, section_id: impl Into<String>) -> Self {
        self.chapter_id = Some(chapter_id.into());
        self.section_id = Some(section_id.into());
        self
    }

    /// Sets the report summary.
    #[must_use]
    pub const fn summary(mut self, summary: ReportSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Adds a timeline entry.
    #[must_use]
    pub fn timeline_entry(mut self, entry: TimelineEntry) -> Self {
        self.timeline.push(entry);
        self
    }

    /// Sets the hint tally.
    #[must_use]
    pub fn hints(mut self, hints: Vec<HintTally>) -> Self {
        self.hints = hints;
        self
    }

    /// Adds a recommendation.
    #[must_use]
    pub fn recommendation(mut self, rec: Recommendation) -> Self {
        self.recommendations.push(rec);
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if required fields are missing.
    pub fn build(self) -> Result<Report> {
        let session_id = self
            .session_id
            .ok_or_else(|| ReportError::InvalidData("session_id is required".to_string()))?;

        let chapter_id = self
            .chapter_id
            .ok_or_else(|| ReportError::InvalidData("chapter_id is required".to_string()))?;

        let summary = self
            .summary
            .ok_or_else(|| ReportError::InvalidData("summary is required".to_string()))?;

        Ok(Report {
            session_id,
            chapter_id,
            section_id: self.section_id.unwrap_or_default(),
            summary,
            timeline: self.timeline,
            hints: self.hints,
            recommendations: self.recommendations,
        })
    }
}

// ============================================================================
// ReportSummary
// ============================================================================

/// High-level summary of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Pathway the session ended on.
    pub final_pathway: ReportPathway,

    /// Successful runs over all runs.
    pub success_rate: f64,

    /// Final confidence score.
    pub confidence_score: f64,

    /// Seconds spent in the chapter.
    pub time_spent_seconds: u64,

    /// Wall-clock duration of the session in seconds.
    pub duration_seconds: u64,

    /// Simulation ticks applied.
    pub ticks: u64,

    /// Number of pathway changes.
    pub pathway_changes: usize,

    /// Final counters.
    pub metrics: SessionMetrics,
}

// ============================================================================
// TimelineEntry
// ============================================================================

/// A timestamped event from the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,

    /// Simulation tick the event happened at.
    pub tick: u64,

    /// Short description of the event.
    pub event: String,

    /// Optional extra context.
    pub details: Option<String>,
}

impl TimelineEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(tick: u64, event: impl Into<String>) -> Self {
        Self::at_time(Utc::now(), tick, event)
    }

    /// Creates an entry with details, stamped with the current time.
    #[must_use]
    pub fn with_details(tick: u64, event: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(tick, event)
        }
    }

    /// Creates an entry at a specific time.
    #[must_use]
    pub fn at_time(timestamp: DateTime<Utc>, tick: u64, event: impl Into<String>) -> Self {
        Self {
            timestamp,
            tick,
            event: event.into(),
            details: None,
        }
    }

    /// Adds details to the entry.
    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// ============================================================================
// HintTally
// ============================================================================

/// How often one hint was shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintTally {
    /// Hint kind, e.g. `descriptive_prompts`.
    pub hint: String,
    /// Times the hint was shown.
    pub count: u32,
}

// ============================================================================
// Recommendation
// ============================================================================

/// A prioritized suggestion for the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Lower numbers come first.
    pub priority: u32,

    /// Area the recommendation is about.
    pub category: String,

    /// What to do.
    pub description: String,
}

impl Recommendation {
    /// Creates a recommendation.
    #[must_use]
    pub fn new(priority: u32, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            category: category.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
