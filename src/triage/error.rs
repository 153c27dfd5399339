use thiserror::Error;

use crate::session_store::SessionStoreError;

/// Failures surfaced by triage operations.
///
/// Classifier and question-generation faults never appear here: they are
/// recovered inside the predictor and selector as degraded results.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Session not found or expired: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TriageError {
    /// Stable machine-readable code for the wire envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::InvalidRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<SessionStoreError> for TriageError {
    fn from(err: SessionStoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(TriageError::SessionNotFound("x".into()).code(), "SESSION_NOT_FOUND");
        assert_eq!(TriageError::InvalidRequest("x".into()).code(), "BAD_REQUEST");
        assert_eq!(
            TriageError::from(SessionStoreError::LockPoisoned).code(),
            "INTERNAL"
        );
    }
}
