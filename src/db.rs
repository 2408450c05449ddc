use std::collections::BTreeSet;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::models::{CourseMeta, CourseStatus, GradeRecord, DEFAULT_WEIGHT};
use crate::snapshot::{parse_timestamp, Scope, Snapshot};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("6a1c0e52-8f3d-4b7a-9e21-5c4d7f0b3a18")?,
            "Dana Okafor",
            "dana.okafor@northfield.edu",
        ),
        (
            Uuid::parse_str("b2e94d07-13a6-4c58-8f0e-7d9a2c61e4b5")?,
            "Ines Carvalho",
            "ines.carvalho@northfield.edu",
        ),
        (
            Uuid::parse_str("f48a3b9c-5d21-4e6f-a073-19c8e5b2d760")?,
            "Tomas Lindqvist",
            "tomas.lindqvist@northfield.edu",
        ),
    ];

    for (id, name, email) in students {
        upsert_student(pool, id, name, email).await?;
    }

    let courses = vec![
        ("MATH101", "Calculus I", Some(4), "in-progress", None),
        ("HIST200", "Modern History", Some(3), "completed", Some("2025-12-18")),
        ("BIO150", "Cell Biology", None, "completed", Some("2025-12-20")),
    ];

    for (code, name, credits, status, completed_at) in courses {
        let completed_at = completed_at.map(parse_timestamp).transpose()?;
        upsert_course(pool, code, name, credits, status, completed_at).await?;
    }

    let grades = vec![
        ("seed-001", "dana.okafor@northfield.edu", "MATH101", "Quiz", 18.0, 20.0, 10.0, "2026-02-02"),
        ("seed-002", "dana.okafor@northfield.edu", "MATH101", "Midterm", 71.0, 100.0, 30.0, "2026-02-16"),
        ("seed-003", "dana.okafor@northfield.edu", "HIST200", "Essay", 46.0, 50.0, 40.0, "2025-11-14"),
        ("seed-004", "dana.okafor@northfield.edu", "HIST200", "Final", 88.0, 100.0, 60.0, "2025-12-10"),
        ("seed-005", "ines.carvalho@northfield.edu", "MATH101", "Quiz", 12.0, 20.0, 10.0, "2026-02-02"),
        ("seed-006", "ines.carvalho@northfield.edu", "BIO150", "Lab", 27.0, 30.0, 20.0, "2025-10-30"),
        ("seed-007", "ines.carvalho@northfield.edu", "BIO150", "Final", 64.0, 100.0, 50.0, "2025-12-12"),
        ("seed-008", "tomas.lindqvist@northfield.edu", "HIST200", "Final", 93.0, 100.0, 60.0, "2025-12-10"),
        ("seed-009", "tomas.lindqvist@northfield.edu", "MATH101", "Midterm", 84.0, 100.0, 30.0, "2026-02-16"),
    ];

    for (source_key, email, course_code, category, score, max_score, weight, created_at) in grades {
        let student_id = student_id_by_email(pool, email).await?;
        let course_id = course_id_by_code(pool, course_code).await?;
        insert_grade(
            pool,
            NewGrade {
                student_id,
                course_id,
                category: Some(category.to_string()),
                score,
                max_score,
                weight,
                created_at: parse_timestamp(created_at)?,
                source_key: source_key.to_string(),
            },
        )
        .await?;
    }

    Ok(())
}

pub async fn import_courses_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        code: String,
        name: String,
        #[serde(default, deserialize_with = "csv::invalid_option")]
        credits: Option<i32>,
        status: String,
        completed_at: Option<String>,
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    let mut upserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let status: CourseStatus = row.status.parse()?;
        let completed_at = match row.completed_at.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw)?),
        };
        upsert_course(pool, &row.code, &row.name, row.credits, status.as_str(), completed_at)
            .await?;
        upserted += 1;
    }

    Ok(upserted)
}

pub async fn import_grades_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        course_code: String,
        category: Option<String>,
        score: f64,
        max_score: f64,
        weight: Option<f64>,
        created_at: String,
        source_key: Option<String>,
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id = upsert_student(pool, Uuid::new_v4(), &row.full_name, &row.email).await?;
        let course_id = course_id_by_code(pool, &row.course_code).await?;

        let source_key = row
            .source_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let affected = insert_grade(
            pool,
            NewGrade {
                student_id,
                course_id,
                category: row.category.filter(|c| !c.is_empty()),
                score: row.score,
                max_score: row.max_score,
                weight: row.weight.unwrap_or(DEFAULT_WEIGHT),
                created_at: parse_timestamp(&row.created_at)?,
                source_key,
            },
        )
        .await?;

        if affected > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Reads the grades in `scope` and the courses they reference inside one
/// read-only repeatable-read transaction.
///
/// The returned scope carries resolved ids, so callers can match on
/// `GradeRecord::student_id` even when the request named an email or code.
pub async fn fetch_snapshot(pool: &PgPool, scope: &Scope) -> anyhow::Result<(Scope, Snapshot)> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let student_id = match scope.student.as_deref() {
        Some(key) => Some(
            resolve_student(&mut tx, key)
                .await?
                .with_context(|| format!("no student matches '{key}'"))?,
        ),
        None => None,
    };
    let course_id = match scope.course.as_deref() {
        Some(key) => Some(
            resolve_course(&mut tx, key)
                .await?
                .with_context(|| format!("no course matches '{key}'"))?,
        ),
        None => None,
    };

    let rows = sqlx::query(
        r#"
        SELECT g.student_id, g.course_id, g.category, g.score, g.max_score,
               g.weight, g.created_at
        FROM gradebook.grades g
        WHERE ($1::uuid IS NULL OR g.student_id = $1)
          AND ($2::uuid IS NULL OR g.course_id = $2)
        ORDER BY g.created_at, g.id
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut referenced: BTreeSet<Uuid> = course_id.into_iter().collect();
    let mut grades = Vec::with_capacity(rows.len());
    for row in rows {
        let grade_course: Uuid = row.get("course_id");
        referenced.insert(grade_course);
        grades.push(GradeRecord {
            student_id: row.get::<Uuid, _>("student_id").to_string(),
            course_id: grade_course.to_string(),
            category: row.get("category"),
            score: row.get("score"),
            max_score: row.get("max_score"),
            weight: row.get("weight"),
            created_at: row.get("created_at"),
        });
    }

    let course_ids: Vec<Uuid> = referenced.into_iter().collect();
    let rows = sqlx::query(
        r#"
        SELECT id, code, name, credits, status, completed_at
        FROM gradebook.courses
        WHERE id = ANY($1)
        ORDER BY code
        "#,
    )
    .bind(&course_ids)
    .fetch_all(&mut *tx)
    .await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("status");
        courses.push(CourseMeta {
            course_id: row.get::<Uuid, _>("id").to_string(),
            code: row.get("code"),
            name: row.get("name"),
            credits: row.get("credits"),
            status: status.parse()?,
            completed_at: row.get("completed_at"),
        });
    }

    tx.commit().await?;

    tracing::debug!(
        grades = grades.len(),
        courses = courses.len(),
        "fetched snapshot"
    );

    let resolved = Scope {
        student: student_id.map(|id| id.to_string()),
        course: course_id.map(|id| id.to_string()),
    };
    Ok((resolved, Snapshot::new(grades, courses)))
}

struct NewGrade {
    student_id: Uuid,
    course_id: Uuid,
    category: Option<String>,
    score: f64,
    max_score: f64,
    weight: f64,
    created_at: DateTime<Utc>,
    source_key: String,
}

async fn insert_grade(pool: &PgPool, grade: NewGrade) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO gradebook.grades
        (id, student_id, course_id, category, score, max_score, weight, created_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(grade.student_id)
    .bind(grade.course_id)
    .bind(grade.category)
    .bind(grade.score)
    .bind(grade.max_score)
    .bind(grade.weight)
    .bind(grade.created_at)
    .bind(grade.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_student(pool: &PgPool, id: Uuid, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO gradebook.students (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn upsert_course(
    pool: &PgPool,
    code: &str,
    name: &str,
    credits: Option<i32>,
    status: &str,
    completed_at: Option<DateTime<Utc>>,
) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO gradebook.courses (id, code, name, credits, status, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (code) DO UPDATE
        SET name = EXCLUDED.name,
            credits = EXCLUDED.credits,
            status = EXCLUDED.status,
            completed_at = EXCLUDED.completed_at
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(name)
    .bind(credits)
    .bind(status)
    .bind(completed_at)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn student_id_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query("SELECT id FROM gradebook.students WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("unknown student {email}"))?
        .get("id");
    Ok(id)
}

async fn course_id_by_code(pool: &PgPool, code: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query("SELECT id FROM gradebook.courses WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("unknown course code {code}"))?
        .get("id");
    Ok(id)
}

async fn resolve_student(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM gradebook.students WHERE id::text = $1 OR email = $1")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|row| row.get("id")))
}

async fn resolve_course(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM gradebook.courses WHERE id::text = $1 OR code = $1")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|row| row.get("id")))
}
