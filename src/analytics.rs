use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::gpa::{gpa_from_refs, validate_grades, weighted_course_average};
use crate::models::{
    CategoryAverage, CourseAnalytics, CourseMeta, CourseStanding, DistributionBucket,
    GradeRecord, RecentGrade, StudentAnalytics,
};
use crate::scale::{letter_grade, percentage_to_gpa_point, round1, round2, LetterGrade};

pub const COURSE_RECENT_LIMIT: usize = 6;
pub const STUDENT_RECENT_LIMIT: usize = 5;

/// Display aggregates for every grade posted in one course.
pub fn compute_course_analytics(course_grades: &[GradeRecord]) -> Result<CourseAnalytics> {
    let grades: Vec<&GradeRecord> = course_grades.iter().collect();
    validate_grades(grades.iter().copied())?;

    let total_students = grades
        .iter()
        .map(|grade| grade.student_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    tracing::debug!(
        grades = grades.len(),
        students = total_students,
        "computed course analytics"
    );

    Ok(CourseAnalytics {
        average_score: average_score(&grades),
        total_grades: grades.len(),
        total_students,
        grade_distribution: grade_distribution(&grades),
        by_category: category_averages(&grades),
        recent_grades: recent_grades(&grades, COURSE_RECENT_LIMIT),
    })
}

/// Per-student dashboard: display aggregates plus course standings and GPA.
pub fn compute_student_analytics(
    student_id: &str,
    grades: &[GradeRecord],
    courses: &[CourseMeta],
) -> Result<StudentAnalytics> {
    let own: Vec<&GradeRecord> = grades
        .iter()
        .filter(|grade| grade.student_id == student_id)
        .collect();

    let gpa = gpa_from_refs(own.clone(), courses)?;
    let standings = course_standings(&own);

    Ok(StudentAnalytics {
        student_id: student_id.to_string(),
        average_score: average_score(&own),
        total_grades: own.len(),
        total_courses: standings.len(),
        grade_distribution: grade_distribution(&own),
        by_category: category_averages(&own),
        recent_grades: recent_grades(&own, STUDENT_RECENT_LIMIT),
        courses: standings,
        gpa,
    })
}

/// Unweighted mean of every record's percentage, rounded to 2 decimals.
pub fn average_score(grades: &[&GradeRecord]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    let total: f64 = grades.iter().map(|grade| grade.percentage()).sum();
    round2(total / grades.len() as f64)
}

/// Letter buckets in fixed A..F order, empty ones included.
pub fn grade_distribution(grades: &[&GradeRecord]) -> Vec<DistributionBucket> {
    let mut counts: HashMap<LetterGrade, usize> = HashMap::new();
    for grade in grades {
        *counts.entry(letter_grade(grade.percentage())).or_insert(0) += 1;
    }

    let total = grades.len();
    LetterGrade::ALL
        .iter()
        .map(|letter| {
            let count = counts.get(letter).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                round1(count as f64 / total as f64 * 100.0)
            };
            DistributionBucket {
                label: letter.bucket_label().to_string(),
                count,
                percentage,
            }
        })
        .collect()
}

/// Mean percentage per category, in first-seen order.
pub fn category_averages(grades: &[&GradeRecord]) -> Vec<CategoryAverage> {
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();

    for grade in grades.iter().copied() {
        let label = grade.category_label();
        let entry = sums.entry(label).or_insert_with(|| {
            order.push(label);
            (0.0, 0)
        });
        entry.0 += grade.percentage();
        entry.1 += 1;
    }

    order
        .into_iter()
        .map(|label| {
            let (total, count) = sums[label];
            CategoryAverage {
                category: label.to_string(),
                average: round2(total / count as f64),
                count,
            }
        })
        .collect()
}

/// The `limit` newest records, newest first. Ties keep input order.
pub fn recent_grades(grades: &[&GradeRecord], limit: usize) -> Vec<RecentGrade> {
    let mut sorted: Vec<&GradeRecord> = grades.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    sorted
        .into_iter()
        .take(limit)
        .map(|grade| RecentGrade {
            student_id: grade.student_id.clone(),
            course_id: grade.course_id.clone(),
            category: grade.category_label().to_string(),
            score: grade.score,
            max_score: grade.max_score,
            weight: grade.weight,
            created_at: grade.created_at,
            percentage: round2(grade.percentage()),
        })
        .collect()
}

fn course_standings(grades: &[&GradeRecord]) -> Vec<CourseStanding> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_course: HashMap<&str, Vec<&GradeRecord>> = HashMap::new();
    for grade in grades.iter().copied() {
        by_course
            .entry(grade.course_id.as_str())
            .or_insert_with(|| {
                order.push(grade.course_id.as_str());
                Vec::new()
            })
            .push(grade);
    }

    order
        .into_iter()
        .filter_map(|course_id| {
            let course_grades = &by_course[course_id];
            let percentage = round2(weighted_course_average(course_grades.iter().copied())?);
            Some(CourseStanding {
                course_id: course_id.to_string(),
                percentage,
                letter: letter_grade(percentage),
                points: percentage_to_gpa_point(percentage),
                grade_count: course_grades.len(),
            })
        })
        .collect()
}
