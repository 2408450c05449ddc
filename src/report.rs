use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{
    CategoryAverage, CourseAnalytics, CourseBreakdown, CourseMeta, DistributionBucket,
    RecentGrade, StudentAnalytics,
};

pub fn build_student_report(
    student_label: &str,
    generated_on: NaiveDate,
    analytics: &StudentAnalytics,
) -> String {
    let gpa = &analytics.gpa;
    let mut output = String::new();

    let _ = writeln!(output, "# Student Grade Report");
    let _ = writeln!(output, "Generated for {} on {}", student_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## GPA");
    let _ = writeln!(
        output,
        "- Completed: {:.2} over {} credits",
        gpa.gpa, gpa.total_credits
    );
    let _ = writeln!(
        output,
        "- Projected: {:.2} over {} credits (in-progress courses at their current average)",
        gpa.projected_gpa, gpa.projected_total_credits
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Completed Courses");
    write_courses(&mut output, &gpa.completed_courses, "No completed courses yet.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## In Progress");
    write_courses(&mut output, &gpa.in_progress_courses, "No courses in progress.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Categories");
    write_categories(&mut output, &analytics.by_category);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    write_distribution(&mut output, &analytics.grade_distribution, analytics.total_grades);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Grades");
    write_recent(&mut output, &analytics.recent_grades);

    output
}

pub fn build_course_report(
    course: Option<&CourseMeta>,
    generated_on: NaiveDate,
    analytics: &CourseAnalytics,
) -> String {
    let mut output = String::new();
    let course_label = match course {
        Some(meta) if !meta.code.is_empty() => format!("{} {}", meta.code, meta.name),
        Some(meta) => meta.course_id.clone(),
        None => "all courses".to_string(),
    };

    let _ = writeln!(output, "# Course Analytics Report");
    let _ = writeln!(output, "Generated for {} on {}", course_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Average score {:.2}% across {} grades from {} students",
        analytics.average_score, analytics.total_grades, analytics.total_students
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    write_distribution(&mut output, &analytics.grade_distribution, analytics.total_grades);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Categories");
    write_categories(&mut output, &analytics.by_category);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Grades");
    write_recent(&mut output, &analytics.recent_grades);

    output
}

fn write_courses(output: &mut String, rows: &[CourseBreakdown], empty: &str) {
    if rows.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for row in rows {
        let _ = writeln!(
            output,
            "- {} {}: {:.2}% ({:.1} points, {} credits)",
            row.course_code, row.course_name, row.percentage, row.points, row.credits
        );
    }
}

fn write_categories(output: &mut String, categories: &[CategoryAverage]) {
    if categories.is_empty() {
        let _ = writeln!(output, "No grades recorded.");
        return;
    }
    for category in categories {
        let _ = writeln!(
            output,
            "- {}: {:.2}% average across {} grades",
            category.category, category.average, category.count
        );
    }
}

fn write_distribution(output: &mut String, buckets: &[DistributionBucket], total: usize) {
    if total == 0 {
        let _ = writeln!(output, "No grades recorded.");
        return;
    }
    for bucket in buckets {
        let _ = writeln!(
            output,
            "- {}: {} ({:.1}%)",
            bucket.label, bucket.count, bucket.percentage
        );
    }
}

fn write_recent(output: &mut String, grades: &[RecentGrade]) {
    if grades.is_empty() {
        let _ = writeln!(output, "No grades recorded.");
        return;
    }
    for grade in grades {
        let _ = writeln!(
            output,
            "- {} {} ({}): {}/{} = {:.2}% on {}",
            grade.course_id,
            grade.category,
            grade.student_id,
            grade.score,
            grade.max_score,
            grade.percentage,
            grade.created_at.date_naive()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{compute_course_analytics, compute_student_analytics};
    use crate::models::{CourseStatus, GradeRecord};
    use chrono::{TimeZone, Utc};

    fn grade(course_id: &str, category: &str, score: f64) -> GradeRecord {
        GradeRecord {
            student_id: "dana".to_string(),
            course_id: course_id.to_string(),
            category: Some(category.to_string()),
            score,
            max_score: 100.0,
            weight: 10.0,
            created_at: Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap(),
        }
    }

    fn course(course_id: &str, code: &str, status: CourseStatus) -> CourseMeta {
        CourseMeta {
            course_id: course_id.to_string(),
            code: code.to_string(),
            name: "Survey".to_string(),
            credits: Some(3),
            status,
            completed_at: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn student_report_lists_gpa_and_sections() {
        let grades = vec![grade("h", "Final", 91.0), grade("m", "Quiz", 72.0)];
        let courses = vec![
            course("h", "HIST200", CourseStatus::Completed),
            course("m", "MATH101", CourseStatus::InProgress),
        ];
        let analytics = compute_student_analytics("dana", &grades, &courses).unwrap();

        let report = build_student_report("Dana Okafor", today(), &analytics);
        assert!(report.starts_with("# Student Grade Report"));
        assert!(report.contains("Generated for Dana Okafor on 2026-03-01"));
        assert!(report.contains("- Completed: 4.00 over 3 credits"));
        assert!(report.contains("- Projected: 3.35 over 6 credits"));
        assert!(report.contains("- HIST200 Survey: 91.00% (4.0 points, 3 credits)"));
        assert!(report.contains("- MATH101 Survey: 72.00% (2.7 points, 3 credits)"));
        assert!(report.contains("- Quiz: 72.00% average across 1 grades"));
    }

    #[test]
    fn empty_reports_say_so() {
        let analytics = compute_student_analytics("nobody", &[], &[]).unwrap();
        let report = build_student_report("nobody", today(), &analytics);
        assert!(report.contains("No completed courses yet."));
        assert!(report.contains("No courses in progress."));
        assert!(report.contains("No grades recorded."));

        let course_analytics = compute_course_analytics(&[]).unwrap();
        let report = build_course_report(None, today(), &course_analytics);
        assert!(report.contains("Generated for all courses"));
        assert!(report.contains("across 0 grades from 0 students"));
    }

    #[test]
    fn course_report_uses_course_code() {
        let grades = vec![grade("m", "Quiz", 95.0), grade("m", "Quiz", 65.0)];
        let meta = course("m", "MATH101", CourseStatus::InProgress);
        let analytics = compute_course_analytics(&grades).unwrap();

        let report = build_course_report(Some(&meta), today(), &analytics);
        assert!(report.contains("Generated for MATH101 Survey on 2026-03-01"));
        assert!(report.contains("- A (90-100%): 1 (50.0%)"));
        assert!(report.contains("- D (60-69%): 1 (50.0%)"));
    }
}
