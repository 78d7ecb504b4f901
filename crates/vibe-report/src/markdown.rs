//! Markdown report generation for engagement sessions.
//!
//! [`MarkdownGenerator`] renders a [`Report`] as a document with:
//!
//! - A summary table with the final pathway and scores
//! - Activity counters
//! - A timeline of the session
//! - How often each hint was shown
//! - Prioritized recommendations
//!
//! # Example
//!
//! ```rust
//! use vibe_report::{MarkdownGenerator, Report};
//!
//! let report = Report {
//!     chapter_id: "chapter_01".to_string(),
//!     section_id: "intro".to_string(),
//!     ..Report::default()
//! };
//!
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Session Report: chapter\\_01 / intro"));
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{Report, TimelineEntry};

/// Generates Markdown reports from finished sessions.
pub struct MarkdownGenerator<'a> {
    report: &'a Report,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report, footer included.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_activity(&mut output);
        self.write_timeline(&mut output);
        self.write_hints(&mut output);
        self.write_recommendations(&mut output);
        Self::write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Session Report: {} / {}\n",
            escape_markdown(&self.report.chapter_id),
            escape_markdown(&self.report.section_id)
        );
    }

    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Pathway | {} |", summary.final_pathway);
        let _ = writeln!(
            output,
            "| Success Rate | {} |",
            format_percent(summary.success_rate)
        );
        let _ = writeln!(
            output,
            "| Confidence | {} |",
            format_percent(summary.confidence_score)
        );
        let _ = writeln!(
            output,
            "| Time Spent | {} |",
            format_duration(summary.time_spent_seconds)
        );
        let _ = writeln!(
            output,
            "| Session Length | {} |",
            format_duration(summary.duration_seconds)
        );
        let _ = writeln!(output, "| Ticks | {} |", summary.ticks);
        let _ = writeln!(output, "| Pathway Changes | {} |", summary.pathway_changes);
        let _ = writeln!(output);
    }

    fn write_activity(&self, output: &mut String) {
        let metrics = &self.report.summary.metrics;

        let _ = writeln!(output, "## Activity\n");
        let _ = writeln!(output, "| Counter | Count |");
        let _ = writeln!(output, "|---------|-------|");
        for (label, count) in [
            ("Code Interactions", metrics.code_interactions),
            ("AI Prompts", metrics.ai_prompts),
            ("Code Modifications", metrics.code_modifications),
            ("Successful Runs", metrics.execution_success),
            ("Failed Runs", metrics.execution_failures),
            ("Assistance Requests", metrics.ai_assistance_requests),
            ("Concept Extensions", metrics.concept_extensions),
        ] {
            let _ = writeln!(output, "| {label} | {count} |");
        }
        let _ = writeln!(output);
    }

    fn write_timeline(&self, output: &mut String) {
        let _ = writeln!(output, "## Timeline\n");

        if self.report.timeline.is_empty() {
            let _ = writeln!(output, "*No timeline events recorded.*\n");
            return;
        }

        let _ = writeln!(output, "| Time | Tick | Event | Details |");
        let _ = writeln!(output, "|------|------|-------|---------|");

        for entry in &self.report.timeline {
            Self::write_timeline_entry(output, entry);
        }

        let _ = writeln!(output);
    }

    fn write_timeline_entry(output: &mut String, entry: &TimelineEntry) {
        let details = entry
            .details
            .as_deref()
            .map(escape_markdown)
            .unwrap_or_default();

        let time = format_timestamp(&entry.timestamp);
        let tick = entry.tick;
        let event = escape_markdown(&entry.event);
        let _ = writeln!(output, "| {time} | {tick} | {event} | {details} |");
    }

    fn write_hints(&self, output: &mut String) {
        let _ = writeln!(output, "## Hints\n");

        if self.report.hints.is_empty() {
            let _ = writeln!(output, "*No hints shown.*\n");
            return;
        }

        let _ = writeln!(output, "| Hint | Times Shown |");
        let _ = writeln!(output, "|------|-------------|");
        for tally in &self.report.hints {
            let _ = writeln!(
                output,
                "| {} | {} |",
                escape_markdown(&tally.hint),
                tally.count
            );
        }
        let _ = writeln!(output);
    }

    fn write_recommendations(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommendations\n");

        if self.report.recommendations.is_empty() {
            let _ = writeln!(output, "*No specific recommendations.*\n");
            return;
        }

        let mut sorted_recs: Vec<_> = self.report.recommendations.iter().collect();
        sorted_recs.sort_by_key(|r| r.priority);

        for (index, rec) in sorted_recs.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. **[{}]** {}",
                index + 1,
                escape_markdown(&rec.category),
                escape_markdown(&rec.description),
            );
        }

        let _ = writeln!(output);
    }

    fn write_footer(output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&Utc::now());
        let _ = writeln!(output, "*Generated by Vibe Coding at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a duration in seconds, e.g. `1h 1m 1s`, `45s` or `0s`.
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Formats a `[0, 1]` ratio as a whole percentage.
fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes special Markdown characters so content is not read as formatting.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            // Table cells cannot hold raw newlines
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
