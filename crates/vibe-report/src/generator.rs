//! Builds [`Report`]s from finished sessions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    HintTally, Recommendation, Report, ReportPathway, ReportSummary, SessionMetrics,
    TimelineEntry,
};

/// More failed runs than this suggests practicing prompt writing.
const MANY_FAILURES: u64 = 3;

/// This many pathway changes or more means the metrics hover near a threshold.
const FREQUENT_PATHWAY_CHANGES: usize = 3;

/// Everything the generator needs to know about a finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    /// Session id.
    pub session_id: String,
    /// Chapter the learner was reading.
    pub chapter_id: String,
    /// Section the learner was reading.
    pub section_id: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the session ended.
    pub ended_at: DateTime<Utc>,
    /// Simulation ticks applied.
    pub ticks: u64,
    /// Pathway at the end of the session.
    pub pathway: ReportPathway,
    /// Final counters.
    pub metrics: SessionMetrics,
    /// Every pathway change, oldest first.
    pub pathway_changes: Vec<PathwayChangeInput>,
    /// Hint kinds in the order they were shown.
    pub hints_shown: Vec<String>,
}

/// One pathway change during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwayChangeInput {
    /// Pathway before the change.
    pub from: ReportPathway,
    /// Pathway after the change.
    pub to: ReportPathway,
    /// When the change happened.
    pub at: DateTime<Utc>,
    /// Tick the change happened at.
    pub tick: u64,
}

/// Generates a [`Report`] from a [`ReportInput`].
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    input: ReportInput,
}

impl ReportGenerator {
    /// Creates a generator for one session.
    #[must_use]
    pub const fn new(input: ReportInput) -> Self {
        Self { input }
    }

    /// Builds the report.
    #[must_use]
    pub fn generate(self) -> Report {
        let summary = self.summary();
        let timeline = self.timeline();
        let hints = self.hint_tally();
        let recommendations = self.recommendations();
        let ReportInput {
            session_id,
            chapter_id,
            section_id,
            ..
        } = self.input;

        Report {
            session_id,
            chapter_id,
            section_id,
            summary,
            timeline,
            hints,
            recommendations,
        }
    }

    fn summary(&self) -> ReportSummary {
        let input = &self.input;
        let duration_seconds =
            u64::try_from((input.ended_at - input.started_at).num_seconds()).unwrap_or(0);

        ReportSummary {
            final_pathway: input.pathway,
            success_rate: input.metrics.success_rate(),
            confidence_score: input.metrics.confidence_score,
            time_spent_seconds: input.metrics.time_spent,
            duration_seconds,
            ticks: input.ticks,
            pathway_changes: input.pathway_changes.len(),
            metrics: input.metrics,
        }
    }

    fn timeline(&self) -> Vec<TimelineEntry> {
        let input = &self.input;
        let mut timeline = Vec::with_capacity(input.pathway_changes.len() + 2);

        timeline.push(
            TimelineEntry::at_time(input.started_at, 0, "Session started")
                .details(format!("{} / {}", input.chapter_id, input.section_id)),
        );

        for change in &input.pathway_changes {
            timeline.push(
                TimelineEntry::at_time(change.at, change.tick, "Pathway changed")
                    .details(format!("{} -> {}", change.from, change.to)),
            );
        }

        timeline.push(
            TimelineEntry::at_time(input.ended_at, input.ticks, "Session ended")
                .details(format!("Final pathway: {}", input.pathway)),
        );

        timeline
    }

    /// Counts hints by kind, most frequent first, ties by name.
    fn hint_tally(&self) -> Vec<HintTally> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for hint in &self.input.hints_shown {
            *counts.entry(hint.as_str()).or_default() += 1;
        }

        let mut tally: Vec<_> = counts
            .into_iter()
            .map(|(hint, count)| HintTally {
                hint: hint.to_string(),
                count,
            })
            .collect();
        tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.hint.cmp(&b.hint)));
        tally
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let input = &self.input;
        let metrics = &input.metrics;
        let mut recs = Vec::new();

        if metrics.execution_failures > MANY_FAILURES {
            recs.push(Recommendation::new(
                1,
                "Prompt Writing",
                format!(
                    "{} of {} runs failed. Practice writing more descriptive prompts that spell out inputs, outputs and edge cases.",
                    metrics.execution_failures,
                    metrics.executions()
                ),
            ));
        }

        if metrics.ai_prompts == 0 && metrics.ai_assistance_requests == 0 {
            recs.push(Recommendation::new(
                2,
                "AI Assistant",
                "The AI assistant was never used. Try asking it to explain or extend the example code.",
            ));
        }

        if input.pathway_changes.len() >= FREQUENT_PATHWAY_CHANGES {
            recs.push(Recommendation::new(
                3,
                "Pathway Stability",
                format!(
                    "The pathway changed {} times. Success rate and confidence are hovering near a tier threshold.",
                    input.pathway_changes.len()
                ),
            ));
        }

        if input.pathway == ReportPathway::Ninja {
            recs.push(Recommendation::new(
                4,
                "Next Steps",
                "Ready for the capstone project: build a complete application with AI assistance.",
            ));
        }

        recs
    }
}
