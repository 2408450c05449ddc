use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::{CourseMeta, CourseStatus, GradeRecord, DEFAULT_WEIGHT};

/// Grades plus the course metadata they reference, read at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub grades: Vec<GradeRecord>,
    pub courses: Vec<CourseMeta>,
}

/// Which slice of the gradebook a request is about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub student: Option<String>,
    pub course: Option<String>,
}

#[derive(Deserialize)]
struct GradeCsvRow {
    student_id: String,
    course_id: String,
    category: Option<String>,
    score: f64,
    max_score: f64,
    weight: Option<f64>,
    created_at: String,
}

#[derive(Deserialize)]
struct CourseCsvRow {
    course_id: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    credits: Option<i32>,
    status: String,
    completed_at: Option<String>,
}

impl Snapshot {
    pub fn new(grades: Vec<GradeRecord>, courses: Vec<CourseMeta>) -> Self {
        Self { grades, courses }
    }

    pub fn from_csv_paths(grades_csv: &Path, courses_csv: &Path) -> anyhow::Result<Self> {
        let grades = std::fs::File::open(grades_csv)
            .with_context(|| format!("failed to open {}", grades_csv.display()))?;
        let courses = std::fs::File::open(courses_csv)
            .with_context(|| format!("failed to open {}", courses_csv.display()))?;
        Self::from_csv_readers(grades, courses)
    }

    pub fn from_csv_readers<G: Read, C: Read>(grades: G, courses: C) -> anyhow::Result<Self> {
        let mut grade_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(grades);
        let mut records = Vec::new();
        for (line, result) in grade_reader.deserialize::<GradeCsvRow>().enumerate() {
            let row = result.with_context(|| format!("grades.csv row {}", line + 1))?;
            records.push(GradeRecord {
                created_at: parse_timestamp(&row.created_at)
                    .with_context(|| format!("grades.csv row {}", line + 1))?,
                student_id: row.student_id,
                course_id: row.course_id,
                category: row.category.filter(|c| !c.is_empty()),
                score: row.score,
                max_score: row.max_score,
                weight: row.weight.unwrap_or(DEFAULT_WEIGHT),
            });
        }

        let mut course_reader =
            csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(courses);
        let mut metas = Vec::new();
        for (line, result) in course_reader.deserialize::<CourseCsvRow>().enumerate() {
            let row = result.with_context(|| format!("courses.csv row {}", line + 1))?;
            let completed_at = match row.completed_at.as_deref() {
                None | Some("") => None,
                Some(raw) => Some(
                    parse_timestamp(raw)
                        .with_context(|| format!("courses.csv row {}", line + 1))?,
                ),
            };
            metas.push(CourseMeta {
                status: row
                    .status
                    .parse::<CourseStatus>()
                    .with_context(|| format!("courses.csv row {}", line + 1))?,
                course_id: row.course_id,
                code: row.code,
                name: row.name,
                credits: row.credits,
                completed_at,
            });
        }

        tracing::debug!(
            grades = records.len(),
            courses = metas.len(),
            "loaded csv snapshot"
        );
        Ok(Self::new(records, metas))
    }

    /// Narrows the snapshot to one student and/or one course.
    ///
    /// Keeps the courses referenced by the surviving grades, plus the
    /// requested course even when it has no grades yet.
    pub fn scoped(&self, student_id: Option<&str>, course_id: Option<&str>) -> Snapshot {
        let grades: Vec<GradeRecord> = self
            .grades
            .iter()
            .filter(|g| student_id.map_or(true, |id| g.student_id == id))
            .filter(|g| course_id.map_or(true, |id| g.course_id == id))
            .cloned()
            .collect();

        let referenced: HashSet<&str> = grades
            .iter()
            .map(|g| g.course_id.as_str())
            .chain(course_id)
            .collect();
        let courses = self
            .courses
            .iter()
            .filter(|c| referenced.contains(c.course_id.as_str()))
            .cloned()
            .collect();

        Snapshot::new(grades, courses)
    }

    pub fn scoped_to(&self, scope: &Scope) -> Snapshot {
        self.scoped(scope.student.as_deref(), scope.course.as_deref())
    }

    pub fn course(&self, course_id: &str) -> Option<&CourseMeta> {
        self.courses.iter().find(|c| c.course_id == course_id)
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid timestamp '{raw}'"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("invalid timestamp")?;
    Ok(midnight.and_utc())
}
