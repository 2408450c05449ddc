//! Postgres adapter tests. Each test gets a fresh database with migrations
//! applied; run with `DATABASE_URL` set and `cargo test -- --ignored`.

use std::path::PathBuf;

use gradebook_aggregator::compute_gpa;
use gradebook_aggregator::db::{fetch_snapshot, import_courses_csv, import_grades_csv, seed};
use gradebook_aggregator::snapshot::Scope;
use pretty_assertions::assert_eq;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const COURSES_CSV: &str = "\
code,name,credits,status,completed_at
STAT210,Applied Statistics,4,completed,2025-12-15
CHEM101,General Chemistry,,in-progress,
";

const GRADES_CSV: &str = "\
full_name,email,course_code,category,score,max_score,weight,created_at,source_key
Rhea Santos,rhea.santos@northfield.edu,STAT210,Final,88,100,60,2025-12-10,sis-001
Rhea Santos,rhea.santos@northfield.edu,CHEM101,Lab,18,20,20,2026-02-03,sis-002
Milo Brandt,milo.brandt@northfield.edu,STAT210,Final,71,100,60,2025-12-10,
";

fn write_temp(label: &str, contents: &str) -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("gradebook-{label}-{}.csv", Uuid::new_v4()));
    std::fs::write(&path, contents)?;
    Ok(path)
}

async fn import_fixture(pool: &PgPool) -> anyhow::Result<()> {
    let courses = write_temp("courses", COURSES_CSV)?;
    let grades = write_temp("grades", GRADES_CSV)?;
    assert_eq!(import_courses_csv(pool, &courses).await?, 2);
    assert_eq!(import_grades_csv(pool, &grades).await?, 3);
    std::fs::remove_file(courses)?;
    std::fs::remove_file(grades)?;
    Ok(())
}

async fn grade_count(pool: &PgPool) -> anyhow::Result<i64> {
    let count = sqlx::query("SELECT COUNT(*) AS n FROM gradebook.grades")
        .fetch_one(pool)
        .await?
        .get("n");
    Ok(count)
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn reimporting_grades_skips_known_source_keys(pool: PgPool) -> anyhow::Result<()> {
    import_fixture(&pool).await?;
    assert_eq!(grade_count(&pool).await?, 3);

    let grades = write_temp("grades", GRADES_CSV)?;
    let inserted = import_grades_csv(&pool, &grades).await?;
    std::fs::remove_file(grades)?;

    // Only the row without a source_key gets a fresh generated key.
    assert_eq!(inserted, 1);
    assert_eq!(grade_count(&pool).await?, 4);
    Ok(())
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn snapshot_resolves_student_email_to_id(pool: PgPool) -> anyhow::Result<()> {
    import_fixture(&pool).await?;

    let (scope, snapshot) = fetch_snapshot(
        &pool,
        &Scope {
            student: Some("rhea.santos@northfield.edu".to_string()),
            course: None,
        },
    )
    .await?;

    let student_id = scope.student.clone().expect("resolved student");
    assert!(Uuid::parse_str(&student_id).is_ok());
    assert_eq!(scope.course, None);
    assert_eq!(snapshot.grades.len(), 2);
    assert!(snapshot.grades.iter().all(|g| g.student_id == student_id));

    let codes: Vec<&str> = snapshot.courses.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["CHEM101", "STAT210"]);
    let chem = snapshot
        .courses
        .iter()
        .find(|c| c.code == "CHEM101")
        .expect("chem course");
    assert_eq!(chem.credits, None);

    // The resolved id works as a scope key on its own.
    let (by_id, again) = fetch_snapshot(&pool, &scope).await?;
    assert_eq!(by_id, scope);
    assert_eq!(again, snapshot);
    Ok(())
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn snapshot_resolves_course_code_to_id(pool: PgPool) -> anyhow::Result<()> {
    import_fixture(&pool).await?;

    let (scope, snapshot) = fetch_snapshot(
        &pool,
        &Scope {
            student: None,
            course: Some("STAT210".to_string()),
        },
    )
    .await?;

    let course_id = scope.course.clone().expect("resolved course");
    assert!(Uuid::parse_str(&course_id).is_ok());
    assert_eq!(snapshot.grades.len(), 2);
    assert!(snapshot.grades.iter().all(|g| g.course_id == course_id));
    assert_eq!(snapshot.courses.len(), 1);
    assert_eq!(snapshot.courses[0].course_id, course_id);
    assert_eq!(snapshot.courses[0].credits, Some(4));

    let students: Vec<&str> = snapshot.grades.iter().map(|g| g.student_id.as_str()).collect();
    assert_ne!(students[0], students[1]);
    Ok(())
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn unknown_scope_key_is_an_error(pool: PgPool) -> anyhow::Result<()> {
    import_fixture(&pool).await?;

    let err = fetch_snapshot(
        &pool,
        &Scope {
            student: Some("nobody@northfield.edu".to_string()),
            course: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("nobody@northfield.edu"));
    Ok(())
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn seeded_gradebook_feeds_the_gpa_engine(pool: PgPool) -> anyhow::Result<()> {
    seed(&pool).await?;
    seed(&pool).await?;
    assert_eq!(grade_count(&pool).await?, 9);

    let (_, snapshot) = fetch_snapshot(
        &pool,
        &Scope {
            student: Some("dana.okafor@northfield.edu".to_string()),
            course: None,
        },
    )
    .await?;
    let result = compute_gpa(&snapshot.grades, &snapshot.courses)?;

    let rows: Vec<(&str, f64, u32)> = result
        .breakdown
        .iter()
        .map(|r| (r.course_code.as_str(), r.percentage, r.credits))
        .collect();
    assert_eq!(rows, vec![("HIST200", 89.6, 3), ("MATH101", 75.75, 4)]);
    assert_eq!(result.gpa, 3.7);
    assert_eq!(result.projected_gpa, 3.3);
    Ok(())
}
