use thiserror::Error;

use deskmate_core::error::DeskmateError;

/// Errors that can occur in the insight analyzers.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<DeskmateError> for InsightError {
    fn from(err: DeskmateError) -> Self {
        match err {
            DeskmateError::InvalidInput(msg) => InsightError::InvalidInput(msg),
            other => InsightError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_storage() {
        let e = InsightError::Storage("db offline".to_string());
        assert_eq!(e.to_string(), "storage error: db offline");
    }

    #[test]
    fn test_from_deskmate_invalid_input_is_kept() {
        let e: InsightError = DeskmateError::InvalidInput("empty".into()).into();
        assert!(matches!(e, InsightError::InvalidInput(msg) if msg == "empty"));
    }

    #[test]
    fn test_from_deskmate_other_is_storage() {
        let e: InsightError = DeskmateError::Storage("locked".into()).into();
        assert!(matches!(e, InsightError::Storage(msg) if msg.contains("locked")));
    }
}
