//! Contextual hints chosen from engagement metrics.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::EngagementMetrics;
use crate::pathway::LearningPathway;

/// Beginners with more failures than this get the prompt-writing hint.
const FAILURE_HINT_THRESHOLD: u64 = 3;

/// Seconds without assistant use before the assistant is suggested.
const ASSISTANT_HINT_AFTER_SECS: u64 = 300;

/// Advanced learners with more successes than this are pointed further.
const FURTHER_READING_SUCCESS_THRESHOLD: u64 = 5;

/// Which rule produced a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    /// Repeated failures while still a beginner.
    DescriptivePrompts,
    /// A while in the chapter without asking the assistant.
    TryAssistant,
    /// Advanced and succeeding.
    FurtherReading,
    /// Fallback encouragement.
    KeepExperimenting,
}

impl HintKind {
    /// Returns the wire name of the hint kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DescriptivePrompts => "descriptive_prompts",
            Self::TryAssistant => "try_assistant",
            Self::FurtherReading => "further_reading",
            Self::KeepExperimenting => "keep_experimenting",
        }
    }

    /// Icon shown next to the hint.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::DescriptivePrompts => "🔍",
            Self::TryAssistant => "💡",
            Self::FurtherReading => "🚀",
            Self::KeepExperimenting => "✨",
        }
    }

    /// Hint text.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::DescriptivePrompts => {
                "Try using more descriptive AI prompts to generate code. Specific details help the AI understand what you need."
            }
            Self::TryAssistant => {
                "The AI assistant can help you understand concepts better. Try asking it questions about the current topic."
            }
            Self::FurtherReading => {
                "You're doing great! Consider exploring the more advanced concepts in the Further Reading section."
            }
            Self::KeepExperimenting => {
                "Keep experimenting with different approaches. The journey of learning is just as important as the destination."
            }
        }
    }
}

impl fmt::Display for HintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hint ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveHint {
    /// The rule that fired.
    pub kind: HintKind,
    /// Emoji icon.
    pub icon: String,
    /// Hint text.
    pub text: String,
}

impl From<HintKind> for AdaptiveHint {
    fn from(kind: HintKind) -> Self {
        Self {
            kind,
            icon: kind.icon().to_string(),
            text: kind.text().to_string(),
        }
    }
}

/// Picks the hint rule that applies to the metrics.
///
/// Rules are checked in a fixed order and the first match wins. Uses the
/// stored pathway, not a fresh classification.
#[must_use]
pub fn select_hint(metrics: &EngagementMetrics) -> HintKind {
    let pathway = metrics.learning_pathway();

    if metrics.execution_failures() > FAILURE_HINT_THRESHOLD && pathway == LearningPathway::Beginner
    {
        HintKind::DescriptivePrompts
    } else if metrics.ai_assistance_requests() == 0
        && metrics.time_spent() > ASSISTANT_HINT_AFTER_SECS
        && pathway != LearningPathway::Ninja
    {
        HintKind::TryAssistant
    } else if pathway == LearningPathway::Advanced
        && metrics.execution_success() > FURTHER_READING_SUCCESS_THRESHOLD
    {
        HintKind::FurtherReading
    } else {
        HintKind::KeepExperimenting
    }
}

/// Generates the contextual hint for a chapter section.
///
/// The chapter and section only appear in debug logs.
#[must_use]
pub fn generate_hint(metrics: &EngagementMetrics, chapter_id: &str, section_id: &str) -> AdaptiveHint {
    let kind = select_hint(metrics);
    debug!(
        chapter = %chapter_id,
        section = %section_id,
        pathway = %metrics.learning_pathway(),
        hint = %kind,
        "Generated hint"
    );
    AdaptiveHint::from(kind)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRecord;

    fn metrics(record: MetricsRecord) -> EngagementMetrics {
        EngagementMetrics::from(record)
    }

    #[test]
    fn test_failing_beginner_gets_prompt_hint() {
        let m = metrics(MetricsRecord {
            execution_failures: 4,
            ..MetricsRecord::default()
        });
        let hint = generate_hint(&m, "chapter_01", "intro");
        assert_eq!(hint.kind, HintKind::DescriptivePrompts);
        assert_eq!(hint.icon, "🔍");
        assert!(hint.text.starts_with("Try using more descriptive AI prompts"));
    }

    #[test]
    fn test_three_failures_is_not_enough() {
        let m = metrics(MetricsRecord {
            execution_failures: 3,
            ..MetricsRecord::default()
        });
        assert_eq!(select_hint(&m), HintKind::KeepExperimenting);
    }

    #[test]
    fn test_idle_without_assistant_gets_assistant_hint() {
        let m = metrics(MetricsRecord {
            time_spent: 301,
            ..MetricsRecord::default()
        });
        let hint = generate_hint(&m, "chapter_02", "setup");
        assert_eq!(hint.kind, HintKind::TryAssistant);
        assert_eq!(hint.icon, "💡");
    }

    #[test]
    fn test_ninja_skips_assistant_hint() {
        let m = metrics(MetricsRecord {
            time_spent: 600,
            execution_success: 9,
            execution_failures: 1,
            confidence_score: 0.9,
            ..MetricsRecord::default()
        });
        assert_eq!(m.learning_pathway(), LearningPathway::Ninja);
        assert_eq!(select_hint(&m), HintKind::KeepExperimenting);
    }

    #[test]
    fn test_successful_advanced_gets_further_reading() {
        let m = metrics(MetricsRecord {
            execution_success: 6,
            execution_failures: 2,
            confidence_score: 0.7,
            ai_assistance_requests: 1,
            ..MetricsRecord::default()
        });
        assert_eq!(m.learning_pathway(), LearningPathway::Advanced);
        let hint = generate_hint(&m, "chapter_03", "patterns");
        assert_eq!(hint.kind, HintKind::FurtherReading);
        assert_eq!(hint.icon, "🚀");
    }

    #[test]
    fn test_failure_rule_precedes_further_reading() {
        // Both the failure count and success count are high, but the learner
        // is still a beginner, so only the first rule can apply.
        let m = metrics(MetricsRecord {
            execution_success: 6,
            execution_failures: 6,
            confidence_score: 0.9,
            ..MetricsRecord::default()
        });
        assert_eq!(select_hint(&m), HintKind::DescriptivePrompts);
    }

    #[test]
    fn test_default_hint() {
        let hint = generate_hint(&EngagementMetrics::new(), "overview", "start");
        assert_eq!(hint.kind, HintKind::KeepExperimenting);
        assert_eq!(hint.icon, "✨");
        assert_eq!(
            hint.text,
            "Keep experimenting with different approaches. The journey of learning is just as important as the destination."
        );
    }

    #[test]
    fn test_hint_is_deterministic() {
        let m = metrics(MetricsRecord {
            time_spent: 400,
            execution_failures: 2,
            ..MetricsRecord::default()
        });
        assert_eq!(generate_hint(&m, "a", "b"), generate_hint(&m, "a", "b"));
    }

    #[test]
    fn test_hint_serialization() {
        let json = serde_json::to_value(AdaptiveHint::from(HintKind::TryAssistant)).unwrap();
        assert_eq!(json["kind"], "try_assistant");
        assert_eq!(json["icon"], "💡");
    }
}
