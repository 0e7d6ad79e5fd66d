use std::fmt;

/// Input-shape validation error for the scoring entry points.
///
/// Internal invariant violations (decomposition passes disagreeing with
/// each other) are not represented here: they panic at the point of
/// detection, since they indicate a bug in the pipeline rather than a
/// malformed caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    RowLengthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    DeadGridSizeMismatch {
        expected_rows: usize,
        found_rows: usize,
    },
    InvalidColorValue {
        raw: i8,
    },
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringError::RowLengthMismatch {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {row} has length {found}, expected {expected}"
            ),
            ScoringError::DeadGridSizeMismatch {
                expected_rows,
                found_rows,
            } => write!(
                f,
                "marked_dead has {found_rows} rows, expected {expected_rows}"
            ),
            ScoringError::InvalidColorValue { raw } => {
                write!(f, "invalid color value: {raw}")
            }
        }
    }
}

impl std::error::Error for ScoringError {}
