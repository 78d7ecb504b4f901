//! Teacher dashboard data.
//!
//! The dashboard reads from a [`DashboardRepository`]. [`MockDashboard`]
//! serves the canned class used by the book's demo site; a real backend
//! would implement the same trait.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VibeError};
use crate::pathway::LearningPathway;

/// Students seen within this many minutes count as active.
const ACTIVE_WITHIN_MINUTES: u32 = 24 * 60;

/// Students unseen for at least this many minutes count as inactive.
const INACTIVE_AFTER_MINUTES: u32 = 7 * 24 * 60;

/// Students with an engagement score below this are at risk.
const AT_RISK_ENGAGEMENT_BELOW: u8 = 60;

/// Sections per chapter.
const SECTIONS_PER_CHAPTER: u8 = 6;

const AVATAR_BASE_URL: &str = "https://randomuser.me/api/portraits/";

// ============================================================================
// Filters
// ============================================================================

/// Student status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every student.
    #[default]
    All,
    /// Seen within the last day.
    Active,
    /// Not seen for a week or more.
    Inactive,
    /// Engagement score below 60.
    AtRisk,
}

impl StatusFilter {
    /// Returns the wire name of the filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::AtRisk => "at-risk",
        }
    }

    /// Returns `true` if the student passes the filter.
    #[must_use]
    pub const fn matches(self, student: &Student) -> bool {
        match self {
            Self::All => true,
            Self::Active => student.minutes_since_active < ACTIVE_WITHIN_MINUTES,
            Self::Inactive => student.minutes_since_active >= INACTIVE_AFTER_MINUTES,
            Self::AtRisk => student.engagement_score < AT_RISK_ENGAGEMENT_BELOW,
        }
    }

    /// Group name used in metric insights.
    const fn group_name(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::AtRisk => "at-risk",
            Self::All | Self::Inactive => "all",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = VibeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "at-risk" | "at_risk" => Ok(Self::AtRisk),
            _ => Err(VibeError::invalid_input(format!(
                "Unknown filter '{s}': expected one of all, active, inactive, at-risk"
            ))),
        }
    }
}

/// Period the metric trends are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    /// Previous day.
    Day,
    /// Previous week.
    #[default]
    Week,
    /// Previous month.
    Month,
}

impl Timeframe {
    /// Returns the wire name of the timeframe.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = VibeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(VibeError::invalid_input(format!(
                "Unknown timeframe '{s}': expected one of day, week, month"
            ))),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A chapter the dashboard can scope to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter id, e.g. `chapter_01`.
    pub id: String,
    /// Display title.
    pub title: String,
}

/// One student row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Student id.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Avatar image URL.
    pub avatar: String,
    /// Chapter progress in percent.
    pub progress: u8,
    /// Current learning pathway.
    pub pathway: LearningPathway,
    /// Human-readable last activity.
    pub last_active: String,
    /// Minutes since the last activity.
    pub minutes_since_active: u32,
    /// Engagement score from 0 to 100.
    pub engagement_score: u8,
    /// Sections completed.
    pub completed_sections: u8,
    /// Sections in the chapter.
    pub total_sections: u8,
}

/// Share of students on one pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayShare {
    /// The pathway.
    pub pathway: LearningPathway,
    /// Display label.
    pub label: String,
    /// Number of students.
    pub count: u32,
    /// Share of the filtered class in percent.
    pub percentage: f64,
    /// Chart color.
    pub color: String,
    /// What the tier means.
    pub description: String,
}

/// Direction of a metric since the previous timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Increased.
    Up,
    /// Decreased.
    Down,
    /// Roughly unchanged.
    Neutral,
}

impl Trend {
    /// Suggested teacher action for the trend.
    #[must_use]
    pub const fn recommendation(self) -> &'static str {
        match self {
            Self::Up => "Maintain current instructional approach",
            Self::Down => "Consider focused interventions",
            Self::Neutral => "Monitor for any changes",
        }
    }

    const fn adjective(self) -> &'static str {
        match self {
            Self::Up => "improved",
            Self::Down => "declining",
            Self::Neutral => "stable",
        }
    }

    const fn change(self) -> &'static str {
        match self {
            Self::Up => "increased",
            Self::Down => "decreased",
            Self::Neutral => "remained stable",
        }
    }
}

/// Unit of a metric's average value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    /// Minutes.
    Minutes,
    /// Percent.
    Percent,
    /// Plain count or ratio.
    Count,
}

/// Aggregated engagement metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    /// Metric id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the metric measures.
    pub description: String,
    /// Class average.
    pub average_value: f64,
    /// Unit of `average_value`.
    pub unit: MetricUnit,
    /// `average_value` formatted with its unit.
    pub display_value: String,
    /// Direction since the previous timeframe.
    pub trend: Trend,
    /// Size of the change in percent.
    pub trend_value: f64,
    /// Suggested teacher action.
    pub recommendation: String,
    /// Explanatory bullet points.
    pub insights: Vec<String>,
}

// ============================================================================
// Repository
// ============================================================================

/// Read access to class data for the teacher dashboard.
pub trait DashboardRepository: Send + Sync + fmt::Debug {
    /// Chapters the dashboard can scope to.
    fn chapters(&self) -> Vec<Chapter>;

    /// Students in a chapter that pass the filter.
    fn students(&self, chapter_id: &str, filter: StatusFilter) -> Vec<Student>;

    /// A single student.
    fn student(&self, student_id: &str) -> Option<Student>;

    /// Pathway distribution for a chapter.
    fn pathway_distribution(&self, chapter_id: &str, filter: StatusFilter) -> Vec<PathwayShare>;

    /// Engagement metric summaries for a chapter.
    fn metric_summaries(
        &self,
        chapter_id: &str,
        timeframe: Timeframe,
        filter: StatusFilter,
    ) -> Vec<MetricSummary>;

    /// Students whose name contains `query`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidInput` if the query is blank.
    fn search_students(
        &self,
        chapter_id: &str,
        filter: StatusFilter,
        query: &str,
    ) -> Result<Vec<Student>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(VibeError::invalid_input("Search query cannot be empty"));
        }
        Ok(self
            .students(chapter_id, filter)
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect())
    }
}

/// Canned class data for demos.
#[derive(Debug, Clone)]
pub struct MockDashboard {
    students: Vec<Student>,
}

impl Default for MockDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDashboard {
    /// Creates the demo class of six students.
    #[must_use]
    pub fn new() -> Self {
        let rows: [(&str, &str, &str, u8, LearningPathway, &str, u32, u8, u8); 6] = [
            ("student1", "Alex Johnson", "men/32.jpg", 83, LearningPathway::Ninja, "10 minutes ago", 10, 92, 5),
            ("student2", "Sarah Williams", "women/44.jpg", 67, LearningPathway::Advanced, "2 hours ago", 120, 78, 4),
            ("student3", "Michael Brown", "men/22.jpg", 50, LearningPathway::Beginner, "3 days ago", 3 * 24 * 60, 65, 3),
            ("student4", "Emily Davis", "women/24.jpg", 33, LearningPathway::Beginner, "1 day ago", 24 * 60, 45, 2),
            ("student5", "James Wilson", "men/42.jpg", 100, LearningPathway::Ninja, "5 hours ago", 5 * 60, 98, 6),
            ("student6", "Olivia Martinez", "women/57.jpg", 17, LearningPathway::Beginner, "Just now", 0, 32, 1),
        ];

        let students = rows
            .into_iter()
            .map(
                |(id, name, avatar, progress, pathway, last_active, minutes, engagement, completed)| {
                    Student {
                        id: id.to_string(),
                        name: name.to_string(),
                        avatar: format!("{AVATAR_BASE_URL}{avatar}"),
                        progress,
                        pathway,
                        last_active: last_active.to_string(),
                        minutes_since_active: minutes,
                        engagement_score: engagement,
                        completed_sections: completed,
                        total_sections: SECTIONS_PER_CHAPTER,
                    }
                },
            )
            .collect();

        Self { students }
    }
}

impl DashboardRepository for MockDashboard {
    fn chapters(&self) -> Vec<Chapter> {
        [
            ("overview", "Class Overview"),
            ("chapter_01", "Chapter 1: The Vibe Coding Revolution"),
            ("chapter_02", "Chapter 2: Getting Started"),
            ("chapter_03", "Chapter 3: Advanced Techniques"),
        ]
        .into_iter()
        .map(|(id, title)| Chapter {
            id: id.to_string(),
            title: title.to_string(),
        })
        .collect()
    }

    fn students(&self, chapter_id: &str, filter: StatusFilter) -> Vec<Student> {
        debug!(chapter = %chapter_id, filter = %filter, "Fetching student data");
        self.students
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    fn student(&self, student_id: &str) -> Option<Student> {
        self.students.iter().find(|s| s.id == student_id).cloned()
    }

    fn pathway_distribution(&self, chapter_id: &str, filter: StatusFilter) -> Vec<PathwayShare> {
        debug!(chapter = %chapter_id, filter = %filter, "Fetching pathway distribution");
        let counts: [(u32, f64); 3] = match filter {
            StatusFilter::Active => [(8, 50.0), (6, 37.5), (2, 12.5)],
            StatusFilter::AtRisk => [(4, 66.7), (2, 33.3), (0, 0.0)],
            StatusFilter::All | StatusFilter::Inactive => [(12, 60.0), (5, 25.0), (3, 15.0)],
        };

        LearningPathway::ALL
            .into_iter()
            .zip(counts)
            .map(|(pathway, (count, percentage))| PathwayShare {
                pathway,
                label: pathway.label().to_string(),
                count,
                percentage,
                color: pathway.color().to_string(),
                description: pathway.description().to_string(),
            })
            .collect()
    }

    fn metric_summaries(
        &self,
        chapter_id: &str,
        timeframe: Timeframe,
        filter: StatusFilter,
    ) -> Vec<MetricSummary> {
        debug!(
            chapter = %chapter_id,
            timeframe = %timeframe,
            filter = %filter,
            "Fetching metrics"
        );

        let mut rows = vec![
            ("time_spent", "Average Time Spent", "Average time students spend engaging with chapter content", 23.5, MetricUnit::Minutes, Trend::Up, 12.0),
            ("code_interaction", "Code Interactions", "Average number of times students write or edit code in the sandbox", 17.0, MetricUnit::Count, Trend::Up, 8.0),
            ("ai_prompts", "AI Assistant Usage", "Average number of queries sent to the AI assistant", 9.0, MetricUnit::Count, Trend::Neutral, 2.0),
            ("conceptual_understanding", "Conceptual Understanding", "Estimated understanding level based on interactions (0-100)", 72.0, MetricUnit::Percent, Trend::Up, 5.0),
            ("completion_rate", "Section Completion Rate", "Percentage of students who completed all sections", 68.0, MetricUnit::Percent, Trend::Down, 7.0),
            ("revisit_rate", "Content Revisit Rate", "Percentage of students who revisited sections after completion", 42.0, MetricUnit::Percent, Trend::Up, 15.0),
        ];

        match filter {
            StatusFilter::AtRisk => rows.push((
                "engagement_gap",
                "Engagement Gap",
                "Difference between expected and actual engagement levels for at-risk students",
                28.5,
                MetricUnit::Count,
                Trend::Down,
                4.0,
            )),
            StatusFilter::Active => rows.push((
                "session_frequency",
                "Session Frequency",
                "Average number of coding sessions per week for active students",
                5.2,
                MetricUnit::Count,
                Trend::Up,
                0.8,
            )),
            StatusFilter::All | StatusFilter::Inactive => {}
        }

        rows.into_iter()
            .map(|(id, name, description, average_value, unit, trend, trend_value)| {
                let display_value = match unit {
                    MetricUnit::Minutes => format!("{average_value}m"),
                    MetricUnit::Percent => format!("{average_value}%"),
                    MetricUnit::Count => format!("{average_value}"),
                };
                let insights = vec![
                    format!(
                        "Students in the {} group show {} trends.",
                        filter.group_name(),
                        trend.adjective()
                    ),
                    format!(
                        "Compared to last {timeframe}, this metric has {} by {trend_value}%.",
                        trend.change()
                    ),
                    format!("Recommendation: {}.", trend.recommendation()),
                ];

                MetricSummary {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    average_value,
                    unit,
                    display_value,
                    trend,
                    trend_value,
                    recommendation: trend.recommendation().to_string(),
                    insights,
                }
            })
            .collect()
    }
}
