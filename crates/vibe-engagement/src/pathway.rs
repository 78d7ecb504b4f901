//! Learning pathway tiers and the rule-based classifier.
//!
//! A pathway is a coarse skill tier derived from engagement counters. The
//! classifier is total and pure: the same metrics always give the same tier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VibeError;
use crate::metrics::EngagementMetrics;

/// Success rate a learner must exceed to be classified as ninja.
pub const NINJA_MIN_SUCCESS_RATE: f64 = 0.85;

/// Confidence a learner must exceed to be classified as ninja.
pub const NINJA_MIN_CONFIDENCE: f64 = 0.8;

/// Ninjas send fewer AI prompts than this.
pub const NINJA_MAX_AI_PROMPTS: u64 = 5;

/// Success rate a learner must exceed to be classified as advanced.
pub const ADVANCED_MIN_SUCCESS_RATE: f64 = 0.7;

/// Confidence a learner must exceed to be classified as advanced.
pub const ADVANCED_MIN_CONFIDENCE: f64 = 0.6;

/// Skill tier assigned to a learner.
///
/// Ordered from least to most experienced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LearningPathway {
    /// Learning fundamentals.
    #[default]
    Beginner,
    /// Experimenting with more complex concepts.
    Advanced,
    /// Building complete systems.
    Ninja,
}

impl LearningPathway {
    /// All pathways in ascending order.
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Advanced, Self::Ninja];

    /// Returns the wire name of the pathway.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Advanced => "advanced",
            Self::Ninja => "ninja",
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Advanced => "Advanced",
            Self::Ninja => "Ninja",
        }
    }

    /// Returns a one-line description of the tier.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Beginner => "Learning fundamentals with step-by-step guidance",
            Self::Advanced => "Experimenting with more complex concepts",
            Self::Ninja => "Building complete systems with deep understanding",
        }
    }

    /// Returns the dashboard color for the tier.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Beginner => "#047857",
            Self::Advanced => "#2563eb",
            Self::Ninja => "#9333ea",
        }
    }

    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "advanced" => Some(Self::Advanced),
            "ninja" => Some(Self::Ninja),
            _ => None,
        }
    }
}

impl fmt::Display for LearningPathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningPathway {
    type Err = VibeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            VibeError::invalid_input(format!(
                "Unknown pathway '{s}': expected one of beginner, advanced, ninja"
            ))
        })
    }
}

impl<'de> Deserialize<'de> for LearningPathway {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid pathway '{s}': expected one of 'beginner', 'advanced', 'ninja'"
            ))
        })
    }
}

impl Serialize for LearningPathway {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Classifies engagement metrics into a learning pathway.
///
/// Rules are checked in order and the first match wins:
///
/// 1. success rate > 0.85, confidence > 0.8 and fewer than 5 AI prompts → ninja
/// 2. success rate > 0.7 and confidence > 0.6 → advanced
/// 3. anything else → beginner
///
/// With no recorded executions the success rate is 0, so the result is
/// always beginner.
#[must_use]
pub fn classify(metrics: &EngagementMetrics) -> LearningPathway {
    let success_rate = metrics.success_rate();
    let confidence = metrics.confidence_score();

    if success_rate > NINJA_MIN_SUCCESS_RATE
        && confidence > NINJA_MIN_CONFIDENCE
        && metrics.ai_prompts() < NINJA_MAX_AI_PROMPTS
    {
        LearningPathway::Ninja
    } else if success_rate > ADVANCED_MIN_SUCCESS_RATE && confidence > ADVANCED_MIN_CONFIDENCE {
        LearningPathway::Advanced
    } else {
        LearningPathway::Beginner
    }
}
