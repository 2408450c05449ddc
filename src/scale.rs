use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of each GPA bracket, highest first.
const GPA_BRACKETS: [(f64, f64); 9] = [
    (90.0, 4.0),
    (85.0, 3.7),
    (80.0, 3.3),
    (75.0, 3.0),
    (70.0, 2.7),
    (65.0, 2.3),
    (60.0, 2.0),
    (55.0, 1.7),
    (50.0, 1.0),
];

/// Maps a course percentage onto the 4.0 scale.
pub fn percentage_to_gpa_point(percentage: f64) -> f64 {
    GPA_BRACKETS
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, points)| *points)
        .unwrap_or(0.0)
}

/// Coarse letter used for analytics and per-category display.
///
/// Not interchangeable with [`percentage_to_gpa_point`]: the brackets differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 5] = [
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::F,
    ];

    pub fn bucket_label(self) -> &'static str {
        match self {
            LetterGrade::A => "A (90-100%)",
            LetterGrade::B => "B (80-89%)",
            LetterGrade::C => "C (70-79%)",
            LetterGrade::D => "D (60-69%)",
            LetterGrade::F => "F (0-59%)",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        };
        f.write_str(letter)
    }
}

pub fn letter_grade(percentage: f64) -> LetterGrade {
    match percentage {
        p if p >= 90.0 => LetterGrade::A,
        p if p >= 80.0 => LetterGrade::B,
        p if p >= 70.0 => LetterGrade::C,
        p if p >= 60.0 => LetterGrade::D,
        _ => LetterGrade::F,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpa_brackets_are_inclusive_on_the_lower_bound() {
        assert_eq!(percentage_to_gpa_point(90.0), 4.0);
        assert_eq!(percentage_to_gpa_point(89.99), 3.7);
        assert_eq!(percentage_to_gpa_point(85.0), 3.7);
        assert_eq!(percentage_to_gpa_point(80.0), 3.3);
        assert_eq!(percentage_to_gpa_point(75.0), 3.0);
        assert_eq!(percentage_to_gpa_point(70.0), 2.7);
        assert_eq!(percentage_to_gpa_point(65.0), 2.3);
        assert_eq!(percentage_to_gpa_point(60.0), 2.0);
        assert_eq!(percentage_to_gpa_point(55.0), 1.7);
        assert_eq!(percentage_to_gpa_point(50.0), 1.0);
        assert_eq!(percentage_to_gpa_point(49.999), 0.0);
        assert_eq!(percentage_to_gpa_point(0.0), 0.0);
    }

    #[test]
    fn scores_above_full_marks_stay_at_the_top_bracket() {
        assert_eq!(percentage_to_gpa_point(112.5), 4.0);
        assert_eq!(letter_grade(112.5), LetterGrade::A);
    }

    #[test]
    fn letter_grades_use_their_own_thresholds() {
        assert_eq!(letter_grade(90.0), LetterGrade::A);
        assert_eq!(letter_grade(79.9), LetterGrade::C);
        assert_eq!(letter_grade(59.9), LetterGrade::F);
        assert_eq!(letter_grade(60.0), LetterGrade::D);
        // 85 is a B letter but a 3.7 on the GPA scale
        assert_eq!(letter_grade(85.0), LetterGrade::B);
        assert_eq!(percentage_to_gpa_point(85.0), 3.7);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round2(83.33333), 83.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(round1(16.66), 16.7);
    }

    #[test]
    fn letter_display_and_labels() {
        assert_eq!(LetterGrade::B.to_string(), "B");
        assert_eq!(LetterGrade::F.bucket_label(), "F (0-59%)");
    }
}
