//! Grade aggregation and GPA computation for a course gradebook.
//!
//! The pure core (`scale`, `gpa`, `analytics`) turns a [`snapshot::Snapshot`]
//! of grade records and course metadata into GPA results and display
//! analytics. `db` and `snapshot` load those snapshots; `report` renders them.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod gpa;
pub mod models;
pub mod report;
pub mod scale;
pub mod snapshot;

pub use analytics::{compute_course_analytics, compute_student_analytics};
pub use error::AggregateError;
pub use gpa::{compute_gpa, student_gpa, weighted_course_average};
pub use scale::{letter_grade, percentage_to_gpa_point, LetterGrade};
