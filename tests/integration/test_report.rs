//! Integration tests for the session-to-report pipeline.
//!
//! Drives a real session through a deterministic simulator, then renders the
//! Markdown and JSON reports the CLI writes on shutdown.

use chrono::Utc;
use vibe_engagement::{
    EventKind, LearningPathway, MetricsSimulator, SessionSnapshot, SessionStore, SimulationConfig,
};
use vibe_report::{
    json::JsonGenerator, MarkdownGenerator, PathwayChangeInput, Report, ReportGenerator,
    ReportInput, ReportPathway, SessionMetrics,
};

/// A simulator where every tick is a successful run and confidence climbs by 0.1.
fn confident_simulator() -> MetricsSimulator {
    let settings = SimulationConfig {
        code_interaction_probability: 1.0,
        ai_prompt_probability: 0.0,
        execution_success_probability: 1.0,
        execution_failure_probability: 0.0,
        confidence_step_min: 0.1,
        confidence_step_max: 0.1,
        seed: Some(7),
    };
    MetricsSimulator::new(settings, 5)
}

const fn pathway(p: LearningPathway) -> ReportPathway {
    match p {
        LearningPathway::Beginner => ReportPathway::Beginner,
        LearningPathway::Advanced => ReportPathway::Advanced,
        LearningPathway::Ninja => ReportPathway::Ninja,
    }
}

fn report_for(snapshot: &SessionSnapshot) -> Report {
    let m = &snapshot.metrics;
    let input = ReportInput {
        session_id: snapshot.id.to_string(),
        chapter_id: snapshot.chapter_id.clone(),
        section_id: snapshot.section_id.clone(),
        started_at: snapshot.created_at,
        ended_at: Utc::now(),
        ticks: snapshot.ticks,
        pathway: pathway(m.learning_pathway()),
        metrics: SessionMetrics {
            time_spent: m.time_spent(),
            code_interactions: m.code_interactions(),
            ai_prompts: m.ai_prompts(),
            code_modifications: m.code_modifications(),
            execution_success: m.execution_success(),
            execution_failures: m.execution_failures(),
            ai_assistance_requests: m.ai_assistance_requests(),
            concept_extensions: m.concept_extensions(),
            confidence_score: m.confidence_score(),
        },
        pathway_changes: snapshot
            .pathway_changes
            .iter()
            .map(|c| PathwayChangeInput {
                from: pathway(c.from),
                to: pathway(c.to),
                at: c.at,
                tick: c.tick,
            })
            .collect(),
        hints_shown: snapshot
            .hints_shown
            .iter()
            .map(|h| h.as_str().to_string())
            .collect(),
    };
    ReportGenerator::new(input).generate()
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[test]
fn test_simulated_session_reaches_ninja_report() {
    let mut store = SessionStore::new();
    let mut simulator = confident_simulator();
    let id = store
        .create("chapter_03", "task-form", true)
        .expect("Failed to create session")
        .id
        .to_string();

    for _ in 0..5 {
        store.tick(&id, &mut simulator).expect("Failed to tick");
    }
    let snapshot = store.get(&id).expect("Session vanished");

    assert_eq!(snapshot.metrics.learning_pathway(), LearningPathway::Ninja);
    assert_eq!(snapshot.pathway_changes.len(), 2);

    let report = report_for(&snapshot);
    assert_eq!(report.summary.final_pathway, ReportPathway::Ninja);
    assert_eq!(report.summary.ticks, 5);
    assert_eq!(report.summary.time_spent_seconds, 25);
    assert_eq!(report.summary.pathway_changes, 2);
    assert!((report.summary.success_rate - 1.0).abs() < 1e-9);

    // Started, two changes, ended
    assert_eq!(report.timeline.len(), 4);
    assert_eq!(
        report.timeline[1].details.as_deref(),
        Some("Beginner -> Advanced")
    );
    assert_eq!(
        report.timeline[2].details.as_deref(),
        Some("Advanced -> Ninja")
    );
    assert_eq!(report.hints_shown(), snapshot.hints_shown.len());

    let categories: Vec<_> = report
        .recommendations
        .iter()
        .map(|r| r.category.as_str())
        .collect();
    assert_eq!(categories, ["AI Assistant", "Next Steps"]);
}

#[test]
fn test_struggling_session_renders_markdown_and_json() {
    let mut store = SessionStore::new();
    let id = store
        .create("chapter_01", "intro", false)
        .expect("Failed to create session")
        .id
        .to_string();

    for event in [
        EventKind::AiPrompt,
        EventKind::ExecutionFailure,
        EventKind::ExecutionFailure,
        EventKind::ExecutionFailure,
        EventKind::ExecutionFailure,
        EventKind::ExecutionSuccess,
    ] {
        store.record_event(&id, event).expect("Failed to record");
    }
    let snapshot = store.get(&id).expect("Session vanished");
    let report = report_for(&snapshot);

    assert_eq!(report.summary.final_pathway, ReportPathway::Beginner);
    assert_eq!(report.recommendations.len(), 1);
    assert!(report.recommendations[0]
        .description
        .starts_with("4 of 5 runs failed"));

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.starts_with("# Session Report: chapter\\_01 / intro"));
    assert!(markdown.contains("Prompt Writing"));
    assert!(markdown.contains("| Success Rate | 20% |"));

    let json = JsonGenerator::new(&report)
        .generate()
        .expect("Failed to serialize");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("Invalid JSON");
    assert_eq!(parsed["summary"]["final_pathway"], "beginner");
    assert_eq!(parsed["summary"]["metrics"]["executionFailures"], 4);

    let stem = report.file_stem();
    assert!(stem.starts_with("chapter_01-intro-"));
    assert_eq!(stem.len(), "chapter_01-intro-".len() + 8);
}
