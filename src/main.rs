use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::info;

use gradebook_aggregator::config::{init_tracing, DatabaseConfig, LogFormat};
use gradebook_aggregator::snapshot::{Scope, Snapshot};
use gradebook_aggregator::{analytics, db, gpa, report};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Grade aggregation and GPA reporting for a course gradebook", long_about = None)]
struct Cli {
    #[command(flatten)]
    db: DatabaseConfig,

    /// Log output format (logs are written to stderr)
    #[arg(
        long,
        value_enum,
        env = "GRADEBOOK_LOG_FORMAT",
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read grades from a CSV file instead of Postgres
    #[arg(long, requires = "courses_csv")]
    grades_csv: Option<PathBuf>,
    /// Read course metadata from a CSV file instead of Postgres
    #[arg(long, requires = "grades_csv")]
    courses_csv: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import courses and/or grades from CSV files
    #[command(group(
        ArgGroup::new("files")
            .args(["courses", "grades"])
            .multiple(true)
            .required(true)
    ))]
    Import {
        #[arg(long)]
        courses: Option<PathBuf>,
        #[arg(long)]
        grades: Option<PathBuf>,
    },
    /// Compute completed and projected GPA for a student
    Gpa {
        /// Student id (or email when reading from Postgres)
        #[arg(long)]
        student: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show grade analytics for a course or a student
    #[command(group(
        ArgGroup::new("scope")
            .args(["course", "student"])
            .multiple(false)
            .required(true)
    ))]
    Analytics {
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["course", "student"])
            .multiple(false)
            .required(true)
    ))]
    Report {
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
}

async fn load_snapshot(
    config: &DatabaseConfig,
    source: &SourceArgs,
    scope: Scope,
) -> anyhow::Result<(Scope, Snapshot)> {
    if let (Some(grades_csv), Some(courses_csv)) = (&source.grades_csv, &source.courses_csv) {
        let snapshot = Snapshot::from_csv_paths(grades_csv, courses_csv)?;
        let scoped = snapshot.scoped_to(&scope);
        return Ok((scope, scoped));
    }

    let pool = config.connect().await?;
    db::fetch_snapshot(&pool, &scope).await
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::InitDb => {
            let pool = cli.db.connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = cli.db.connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { courses, grades } => {
            let pool = cli.db.connect().await?;
            if let Some(path) = courses {
                let upserted = db::import_courses_csv(&pool, &path)
                    .await
                    .with_context(|| format!("failed to import {}", path.display()))?;
                println!("Upserted {upserted} courses from {}.", path.display());
            }
            if let Some(path) = grades {
                let inserted = db::import_grades_csv(&pool, &path)
                    .await
                    .with_context(|| format!("failed to import {}", path.display()))?;
                println!("Inserted {inserted} grades from {}.", path.display());
            }
        }
        Commands::Gpa { student, source } => {
            let scope = Scope {
                student: Some(student.clone()),
                course: None,
            };
            let (_, snapshot) = load_snapshot(&cli.db, &source, scope).await?;
            let result = gpa::compute_gpa(&snapshot.grades, &snapshot.courses)?;
            info!(student = %student, gpa = result.gpa, "gpa computed");

            if source.json {
                return print_json(&result);
            }

            if result.breakdown.is_empty() {
                println!("No grades found for {student}.");
                return Ok(());
            }

            println!(
                "GPA for {student}: {:.2} over {} credits (projected {:.2} over {} credits)",
                result.gpa,
                result.total_credits,
                result.projected_gpa,
                result.projected_total_credits
            );
            for row in &result.breakdown {
                println!(
                    "- {} {} [{}]: {:.2}% -> {:.1} points, {} credits",
                    row.course_code,
                    row.course_name,
                    row.status,
                    row.percentage,
                    row.points,
                    row.credits
                );
            }
        }
        Commands::Analytics {
            course,
            student,
            source,
        } => {
            let scope = Scope { student, course };
            let (resolved, snapshot) = load_snapshot(&cli.db, &source, scope).await?;

            if let Some(student_id) = resolved.student.as_deref() {
                let result = analytics::compute_student_analytics(
                    student_id,
                    &snapshot.grades,
                    &snapshot.courses,
                )?;
                if source.json {
                    return print_json(&result);
                }
                println!(
                    "Average {:.2}% across {} grades in {} courses, GPA {:.2} (projected {:.2})",
                    result.average_score,
                    result.total_grades,
                    result.total_courses,
                    result.gpa.gpa,
                    result.gpa.projected_gpa
                );
                for standing in &result.courses {
                    println!(
                        "- {}: {:.2}% ({}, {:.1} points) across {} grades",
                        standing.course_id,
                        standing.percentage,
                        standing.letter,
                        standing.points,
                        standing.grade_count
                    );
                }
            } else {
                let result = analytics::compute_course_analytics(&snapshot.grades)?;
                if source.json {
                    return print_json(&result);
                }
                println!(
                    "Average {:.2}% across {} grades from {} students",
                    result.average_score, result.total_grades, result.total_students
                );
                for bucket in &result.grade_distribution {
                    println!(
                        "- {}: {} ({:.1}%)",
                        bucket.label, bucket.count, bucket.percentage
                    );
                }
            }
        }
        Commands::Report {
            course,
            student,
            out,
            source,
        } => {
            let label = student.clone().or_else(|| course.clone());
            let scope = Scope { student, course };
            let (resolved, snapshot) = load_snapshot(&cli.db, &source, scope).await?;
            let today = Utc::now().date_naive();

            let rendered = if let Some(student_id) = resolved.student.as_deref() {
                let result = analytics::compute_student_analytics(
                    student_id,
                    &snapshot.grades,
                    &snapshot.courses,
                )?;
                report::build_student_report(label.as_deref().unwrap_or(student_id), today, &result)
            } else {
                let result = analytics::compute_course_analytics(&snapshot.grades)?;
                let meta = resolved
                    .course
                    .as_deref()
                    .and_then(|course_id| snapshot.course(course_id));
                report::build_course_report(meta, today, &result)
            };

            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
