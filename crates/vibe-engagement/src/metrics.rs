//! Per-session engagement counters.
//!
//! [`EngagementMetrics`] keeps its learning pathway consistent with its
//! counters: the pathway field is private, only the classifier writes it, and
//! deserialization goes through [`MetricsRecord`] so the tier is recomputed
//! rather than trusted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VibeError;
use crate::pathway::{classify, LearningPathway};
use crate::ticker::TickOutcome;

/// Confidence score a fresh session starts with.
pub const INITIAL_CONFIDENCE: f64 = 0.5;

/// A real interaction reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Wrote or edited code in the sandbox.
    CodeInteraction,
    /// Sent a prompt to the AI assistant.
    AiPrompt,
    /// Changed generated code.
    CodeModification,
    /// Ran code successfully.
    ExecutionSuccess,
    /// Ran code and it failed.
    ExecutionFailure,
    /// Asked the assistant for help understanding something.
    AiAssistanceRequest,
    /// Went beyond the exercise.
    ConceptExtension,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 7] = [
        Self::CodeInteraction,
        Self::AiPrompt,
        Self::CodeModification,
        Self::ExecutionSuccess,
        Self::ExecutionFailure,
        Self::AiAssistanceRequest,
        Self::ConceptExtension,
    ];

    /// Returns the wire name of the event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeInteraction => "code_interaction",
            Self::AiPrompt => "ai_prompt",
            Self::CodeModification => "code_modification",
            Self::ExecutionSuccess => "execution_success",
            Self::ExecutionFailure => "execution_failure",
            Self::AiAssistanceRequest => "ai_assistance_request",
            Self::ConceptExtension => "concept_extension",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = VibeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| VibeError::invalid_input(format!("Unknown event kind '{s}'")))
    }
}

/// Pathway before and after a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathwayTransition {
    /// Pathway before the mutation.
    pub previous: LearningPathway,
    /// Pathway after the mutation.
    pub current: LearningPathway,
}

impl PathwayTransition {
    /// Returns `true` if the tier changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Wire shape of engagement metrics.
///
/// Every field is optional on input. A supplied `learningPathway` is accepted
/// but ignored; the tier is always recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsRecord {
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
    /// Confidence in `[0, 1]`; out-of-range values are clamped.
    pub confidence_score: f64,
    /// Ignored on input.
    pub learning_pathway: Option<LearningPathway>,
    /// Last activity; defaults to now.
    pub last_active: Option<DateTime<Utc>>,
    /// Count of recorded events by kind.
    pub tool_usage_patterns: BTreeMap<String, u64>,
}

impl Default for MetricsRecord {
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
            confidence_score: INITIAL_CONFIDENCE,
            learning_pathway: None,
            last_active: None,
            tool_usage_patterns: BTreeMap::new(),
        }
    }
}

/// Engagement counters for one reading session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "MetricsRecord")]
pub struct EngagementMetrics {
    time_spent: u64,
    code_interactions: u64,
    ai_prompts: u64,
    code_modifications: u64,
    execution_success: u64,
    execution_failures: u64,
    ai_assistance_requests: u64,
    concept_extensions: u64,
    confidence_score: f64,
    learning_pathway: LearningPathway,
    last_active: DateTime<Utc>,
    tool_usage_patterns: BTreeMap<String, u64>,
}

impl Default for EngagementMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl From<MetricsRecord> for EngagementMetrics {
    fn from(record: MetricsRecord) -> Self {
        let confidence = if record.confidence_score.is_nan() {
            INITIAL_CONFIDENCE
        } else {
            record.confidence_score.clamp(0.0, 1.0)
        };

        let mut metrics = Self {
            time_spent: record.time_spent,
            code_interactions: record.code_interactions,
            ai_prompts: record.ai_prompts,
            code_modifications: record.code_modifications,
            execution_success: record.execution_success,
            execution_failures: record.execution_failures,
            ai_assistance_requests: record.ai_assistance_requests,
            concept_extensions: record.concept_extensions,
            confidence_score: confidence,
            learning_pathway: LearningPathway::Beginner,
            last_active: record.last_active.unwrap_or_else(Utc::now),
            tool_usage_patterns: record.tool_usage_patterns,
        };
        metrics.recompute_pathway();
        metrics
    }
}

impl EngagementMetrics {
    /// Creates metrics for a new session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            time_spent: 0,
            code_interactions: 0,
            ai_prompts: 0,
            code_modifications: 0,
            execution_success: 0,
            execution_failures: 0,
            ai_assistance_requests: 0,
            concept_extensions: 0,
            confidence_score: INITIAL_CONFIDENCE,
            learning_pathway: LearningPathway::Beginner,
            last_active: Utc::now(),
            tool_usage_patterns: BTreeMap::new(),
        }
    }

    /// Seconds spent in the chapter.
    #[must_use]
    pub const fn time_spent(&self) -> u64 {
        self.time_spent
    }

    /// Code interactions.
    #[must_use]
    pub const fn code_interactions(&self) -> u64 {
        self.code_interactions
    }

    /// AI prompts sent.
    #[must_use]
    pub const fn ai_prompts(&self) -> u64 {
        self.ai_prompts
    }

    /// Edits to generated code.
    #[must_use]
    pub const fn code_modifications(&self) -> u64 {
        self.code_modifications
    }

    /// Successful runs.
    #[must_use]
    pub const fn execution_success(&self) -> u64 {
        self.execution_success
    }

    /// Failed runs.
    #[must_use]
    pub const fn execution_failures(&self) -> u64 {
        self.execution_failures
    }

    /// Requests for assistant help.
    #[must_use]
    pub const fn ai_assistance_requests(&self) -> u64 {
        self.ai_assistance_requests
    }

    /// Explorations beyond the exercise.
    #[must_use]
    pub const fn concept_extensions(&self) -> u64 {
        self.concept_extensions
    }

    /// Confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    /// The derived learning pathway.
    #[must_use]
    pub const fn learning_pathway(&self) -> LearningPathway {
        self.learning_pathway
    }

    /// Time of the last tick or event.
    #[must_use]
    pub const fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Count of recorded events by kind.
    #[must_use]
    pub const fn tool_usage_patterns(&self) -> &BTreeMap<String, u64> {
        &self.tool_usage_patterns
    }

    /// Share of executions that succeeded, or `0.0` with no executions.
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

    /// Re-runs the classifier and stores the result.
    pub fn recompute_pathway(&mut self) -> PathwayTransition {
        let previous = self.learning_pathway;
        self.learning_pathway = classify(self);
        PathwayTransition {
            previous,
            current: self.learning_pathway,
        }
    }

    /// Applies one real interaction event.
    pub fn record(&mut self, event: EventKind) -> PathwayTransition {
        let counter = match event {
            EventKind::CodeInteraction => &mut self.code_interactions,
            EventKind::AiPrompt => &mut self.ai_prompts,
            EventKind::CodeModification => &mut self.code_modifications,
            EventKind::ExecutionSuccess => &mut self.execution_success,
            EventKind::ExecutionFailure => &mut self.execution_failures,
            EventKind::AiAssistanceRequest => &mut self.ai_assistance_requests,
            EventKind::ConceptExtension => &mut self.concept_extensions,
        };
        *counter = counter.saturating_add(1);

        *self
            .tool_usage_patterns
            .entry(event.as_str().to_string())
            .or_insert(0) += 1;

        self.last_active = Utc::now();
        self.recompute_pathway()
    }

    /// Applies one simulated tick.
    pub fn apply_tick(&mut self, outcome: &TickOutcome) -> PathwayTransition {
        self.time_spent = self.time_spent.saturating_add(outcome.seconds);

        if outcome.code_interaction {
            self.code_interactions = self.code_interactions.saturating_add(1);
        }
        if outcome.ai_prompt {
            self.ai_prompts = self.ai_prompts.saturating_add(1);
        }
        if outcome.execution_success {
            self.execution_success = self.execution_success.saturating_add(1);
        }
        if outcome.execution_failure {
            self.execution_failures = self.execution_failures.saturating_add(1);
        }

        self.confidence_score = (self.confidence_score + outcome.confidence_delta).clamp(0.0, 1.0);
        self.last_active = Utc::now();
        self.recompute_pathway()
    }
}
