use std::collections::{HashMap, HashSet};

use crate::error::{AggregateError, Result};
use crate::models::{CourseBreakdown, CourseMeta, CourseStatus, GpaResult, GradeRecord};
use crate::scale::{percentage_to_gpa_point, round2};

/// Rejects records that cannot yield a percentage or carry an out-of-range weight.
pub fn validate_grades<'a, I>(grades: I) -> Result<()>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    for grade in grades {
        let invalid = |field: &'static str, value: f64| AggregateError::InvalidInput {
            student_id: grade.student_id.clone(),
            course_id: grade.course_id.clone(),
            field,
            value,
        };

        if !grade.max_score.is_finite() || grade.max_score <= 0.0 {
            return Err(invalid("maxScore", grade.max_score));
        }
        if !grade.score.is_finite() || grade.score < 0.0 {
            return Err(invalid("score", grade.score));
        }
        if !grade.weight.is_finite() || !(0.0..=100.0).contains(&grade.weight) {
            return Err(invalid("weight", grade.weight));
        }
    }
    Ok(())
}

/// Weighted mean of the records' percentages.
///
/// Falls back to the plain mean when every weight is zero. Returns `None`
/// for an empty course. The result is neither rounded nor clamped.
pub fn weighted_course_average<'a, I>(grades: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let mut count: usize = 0;
    let mut sum_percent = 0.0;
    let mut sum_weighted = 0.0;
    let mut sum_weights = 0.0;

    for grade in grades {
        let percentage = grade.percentage();
        count += 1;
        sum_percent += percentage;
        sum_weighted += percentage * grade.weight;
        sum_weights += grade.weight;
    }

    if count == 0 {
        None
    } else if sum_weights > 0.0 {
        Some(sum_weighted / sum_weights)
    } else {
        Some(sum_percent / count as f64)
    }
}

/// Credit-weighted GPA over one student's grades.
///
/// `gpa` covers completed courses only; `projected_gpa` treats every other
/// course's current average as its final grade. Courses in `courses` without
/// any grade are left out of the breakdown.
pub fn compute_gpa(grades: &[GradeRecord], courses: &[CourseMeta]) -> Result<GpaResult> {
    gpa_from_refs(grades.iter().collect(), courses)
}

/// [`compute_gpa`] restricted to the grades of `student_id`.
pub fn student_gpa(
    student_id: &str,
    grades: &[GradeRecord],
    courses: &[CourseMeta],
) -> Result<GpaResult> {
    let own = grades
        .iter()
        .filter(|grade| grade.student_id == student_id)
        .collect();
    gpa_from_refs(own, courses)
}

pub(crate) fn gpa_from_refs(
    grades: Vec<&GradeRecord>,
    courses: &[CourseMeta],
) -> Result<GpaResult> {
    validate_grades(grades.iter().copied())?;

    if grades.is_empty() {
        return Ok(GpaResult::empty());
    }

    let by_course = group_by_course(&grades, courses)?;

    let mut breakdown = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for course in courses {
        if !seen.insert(course.course_id.as_str()) {
            continue;
        }
        let Some(course_grades) = by_course.get(course.course_id.as_str()) else {
            continue;
        };
        let Some(average) = weighted_course_average(course_grades.iter().copied()) else {
            continue;
        };
        let percentage = round2(average);

        breakdown.push(CourseBreakdown {
            course_id: course.course_id.clone(),
            course_code: course.code.clone(),
            course_name: course.name.clone(),
            credits: course.effective_credits(),
            status: course.status,
            completed_at: course.completed_at,
            percentage,
            points: percentage_to_gpa_point(percentage),
        });
    }

    let (completed_courses, in_progress_courses): (Vec<_>, Vec<_>) = breakdown
        .iter()
        .cloned()
        .partition(|row| row.status == CourseStatus::Completed);

    let (gpa, total_credits) = credit_weighted(&completed_courses);
    let (projected_gpa, projected_total_credits) = credit_weighted(&breakdown);

    tracing::debug!(
        courses = breakdown.len(),
        completed = completed_courses.len(),
        gpa,
        projected_gpa,
        "computed gpa"
    );

    Ok(GpaResult {
        gpa,
        total_credits,
        breakdown,
        projected_gpa,
        projected_total_credits,
        completed_courses,
        in_progress_courses,
    })
}

fn group_by_course<'a>(
    grades: &[&'a GradeRecord],
    courses: &[CourseMeta],
) -> Result<HashMap<&'a str, Vec<&'a GradeRecord>>> {
    let known: HashSet<&str> = courses.iter().map(|c| c.course_id.as_str()).collect();
    let mut by_course: HashMap<&str, Vec<&GradeRecord>> = HashMap::new();

    for grade in grades.iter().copied() {
        if !known.contains(grade.course_id.as_str()) {
            return Err(AggregateError::MissingCourseReference {
                course_id: grade.course_id.clone(),
            });
        }
        by_course
            .entry(grade.course_id.as_str())
            .or_default()
            .push(grade);
    }

    Ok(by_course)
}

/// Returns the rounded credit-weighted mean of `points` and the credit total.
fn credit_weighted(rows: &[CourseBreakdown]) -> (f64, u64) {
    let total_credits: u64 = rows.iter().map(|row| u64::from(row.credits)).sum();
    if total_credits == 0 {
        return (0.0, 0);
    }
    let total_points: f64 = rows
        .iter()
        .map(|row| row.points * row.credits as f64)
        .sum();
    (round2(total_points / total_credits as f64), total_credits)
}
