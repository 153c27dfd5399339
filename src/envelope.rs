//! Success/failure wire envelope for triage operations.

use serde::{Deserialize, Serialize};

use crate::triage::TriageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// `{"success":true,"data":...}` or `{"success":false,"error":{code,message}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorDetail {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

impl<T> From<Result<T, TriageError>> for Envelope<T> {
    fn from(result: Result<T, TriageError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(TriageError::Internal(detail)) => {
                tracing::error!(detail, "Triage internal error");
                Self::failure("INTERNAL", "An internal error occurred")
            }
            Err(e) => Self::failure(e.code(), e.to_string()),
        }
    }
}
