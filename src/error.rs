//! Error types for the analysis engine.

use thiserror::Error;

/// Errors surfaced by the analysis engine and its collaborators.
///
/// Every variant is terminal for the current call: nothing is retried and no
/// partial result is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied to session {0}")]
    AccessDenied(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("No eye tracking data found for analysis of session {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AnalysisError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Unauthorized => "UNAUTHORIZED",
            AnalysisError::AccessDenied(_) => "ACCESS_DENIED",
            AnalysisError::NotFound(_) => "NOT_FOUND",
            AnalysisError::InsufficientData(_) => "INSUFFICIENT_DATA",
            AnalysisError::InvalidInput(_) => "INVALID_INPUT",
            AnalysisError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            AnalysisError::Unauthorized,
            AnalysisError::AccessDenied("s".into()),
            AnalysisError::NotFound("s".into()),
            AnalysisError::InsufficientData("s".into()),
            AnalysisError::InvalidInput("x".into()),
            AnalysisError::Storage("x".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_error_display() {
        let err = AnalysisError::InsufficientData("abc".to_string());
        assert!(err.to_string().contains("abc"));
        assert_eq!(err.code(), "INSUFFICIENT_DATA");
    }
}
