//! Error types for scadenze-core.

use thiserror::Error;

/// Errors raised by the core.
///
/// Streak transitions are total, so the only failure is a due value that
/// cannot be read as a calendar date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The due value is not a valid calendar date (or date and time).
    #[error("invalid due date: {value:?}")]
    InvalidDate { value: String },
}

impl CoreError {
    pub(crate) fn invalid_date(value: impl Into<String>) -> Self {
        CoreError::InvalidDate {
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_date_display() {
        let err = CoreError::invalid_date("2024-13-01");
        assert_eq!(err.to_string(), "invalid due date: \"2024-13-01\"");
    }
}
