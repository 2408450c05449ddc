use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scale::LetterGrade;

/// Credits assumed for a course whose credit value is missing or not positive.
pub const DEFAULT_CREDITS: u32 = 3;

/// Weight assumed for a grade whose weight was never recorded.
pub const DEFAULT_WEIGHT: f64 = 10.0;

pub const UNCATEGORIZED: &str = "Other";

pub fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

/// One posted grade, normalized at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub student_id: String,
    pub course_id: String,
    #[serde(default)]
    pub category: Option<String>,
    pub score: f64,
    pub max_score: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

impl GradeRecord {
    /// Raw percentage, unrounded. Callers validate `max_score` first.
    pub fn percentage(&self) -> f64 {
        (self.score / self.max_score) * 100.0
    }

    pub fn category_label(&self) -> &str {
        match self.category.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => UNCATEGORIZED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CourseStatus {
    InProgress,
    Completed,
    Archived,
}

impl CourseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::InProgress => "in-progress",
            CourseStatus::Completed => "completed",
            CourseStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in-progress" | "in_progress" | "active" => Ok(CourseStatus::InProgress),
            "completed" => Ok(CourseStatus::Completed),
            "archived" => Ok(CourseStatus::Archived),
            other => anyhow::bail!("unknown course status '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMeta {
    pub course_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// Raw value as stored; see [`CourseMeta::effective_credits`].
    #[serde(default)]
    pub credits: Option<i32>,
    pub status: CourseStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CourseMeta {
    pub fn effective_credits(&self) -> u32 {
        match self.credits {
            Some(credits) if credits > 0 => credits as u32,
            _ => {
                tracing::warn!(
                    course_id = %self.course_id,
                    credits = ?self.credits,
                    "course credits missing or invalid, using default of {DEFAULT_CREDITS}"
                );
                DEFAULT_CREDITS
            }
        }
    }
}

/// One row of the GPA breakdown: a course's weighted standing for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBreakdown {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub credits: u32,
    pub status: CourseStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub percentage: f64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaResult {
    pub gpa: f64,
    pub total_credits: u64,
    pub breakdown: Vec<CourseBreakdown>,
    pub projected_gpa: f64,
    pub projected_total_credits: u64,
    pub completed_courses: Vec<CourseBreakdown>,
    pub in_progress_courses: Vec<CourseBreakdown>,
}

impl GpaResult {
    pub fn empty() -> Self {
        Self {
            gpa: 0.0,
            total_credits: 0,
            breakdown: Vec::new(),
            projected_gpa: 0.0,
            projected_total_credits: 0,
            completed_courses: Vec::new(),
            in_progress_courses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    pub category: String,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGrade {
    pub student_id: String,
    pub course_id: String,
    pub category: String,
    pub score: f64,
    pub max_score: f64,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalytics {
    pub average_score: f64,
    pub total_grades: usize,
    pub total_students: usize,
    pub grade_distribution: Vec<DistributionBucket>,
    pub by_category: Vec<CategoryAverage>,
    pub recent_grades: Vec<RecentGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStanding {
    pub course_id: String,
    pub percentage: f64,
    pub letter: LetterGrade,
    pub points: f64,
    pub grade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalytics {
    pub student_id: String,
    pub average_score: f64,
    pub total_grades: usize,
    pub total_courses: usize,
    pub grade_distribution: Vec<DistributionBucket>,
    pub by_category: Vec<CategoryAverage>,
    pub recent_grades: Vec<RecentGrade>,
    pub courses: Vec<CourseStanding>,
    pub gpa: GpaResult,
}
