use thiserror::Error;

/// Failures the aggregator reports instead of producing numbers.
///
/// An empty scope is not an error: every aggregate resolves to zero or an
/// empty list in that case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error(
        "invalid grade for student {student_id} in course {course_id}: {field} = {value}"
    )]
    InvalidInput {
        student_id: String,
        course_id: String,
        field: &'static str,
        value: f64,
    },

    #[error("grade references course {course_id}, which is not in the snapshot")]
    MissingCourseReference { course_id: String },
}

pub type Result<T> = std::result::Result<T, AggregateError>;
