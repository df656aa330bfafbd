//! Error types shared across the engine.
//!
//! `BackendError` is defined here rather than in `assessly-client` so the
//! loader and the submission flow can downcast it and pull out the
//! backend's human-readable message without string matching.

use thiserror::Error;

use crate::model::QuestionId;

/// Errors that can occur when talking to the assessment backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("backend rejected request (HTTP {status}){}", fmt_message(.message))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The bearer credential was missing or refused.
    #[error("authentication failed{}", fmt_message(.message))]
    Unauthorized { message: Option<String> },

    /// The requested assessment does not exist.
    #[error("assessment not found{}", fmt_message(.message))]
    NotFound { message: Option<String> },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered 2xx with a body we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn fmt_message(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl BackendError {
    /// The human-readable message supplied by the backend, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            BackendError::Rejected { message, .. }
            | BackendError::Unauthorized { message }
            | BackendError::NotFound { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }
}

/// Pick the message to show a user for a failed backend call.
///
/// Uses the backend's own `message` when the error carries one and falls
/// back to `fallback` otherwise.
pub fn user_message(err: &anyhow::Error, fallback: &str) -> String {
    err.downcast_ref::<BackendError>()
        .and_then(BackendError::backend_message)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Errors raised by a draft persistence backend.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored draft is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("draft storage unavailable: {0}")]
    Unavailable(String),
}

/// A rejected answer. The draft is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),

    #[error("option {index} out of range for question {question_id} ({option_count} options)")]
    OptionOutOfRange {
        question_id: QuestionId,
        index: usize,
        option_count: usize,
    },
}

/// Misuse of an attempt in its current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("answers cannot be changed while the attempt is {0}")]
    NotComposing(&'static str),

    #[error("no submission is awaiting confirmation")]
    NotConfirming,

    #[error("no graded result to act on")]
    NotReviewing,

    #[error(transparent)]
    Answer(#[from] AnswerError),
}

/// An in-flight call was aborted by teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled by teardown")]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_backend_message() {
        let err: anyhow::Error = BackendError::Rejected {
            status: 422,
            message: Some("Assessment is closed".into()),
        }
        .into();
        assert_eq!(user_message(&err, "fallback"), "Assessment is closed");
    }

    #[test]
    fn user_message_falls_back() {
        let err: anyhow::Error = BackendError::Network("connection reset".into()).into();
        assert_eq!(user_message(&err, "fallback"), "fallback");

        let err: anyhow::Error = BackendError::Rejected {
            status: 500,
            message: Some("   ".into()),
        }
        .into();
        assert_eq!(user_message(&err, "fallback"), "fallback");

        let err = anyhow::anyhow!("something unrelated");
        assert_eq!(user_message(&err, "fallback"), "fallback");
    }

    #[test]
    fn display_includes_status_and_message() {
        let err = BackendError::Rejected {
            status: 503,
            message: Some("maintenance".into()),
        };
        assert_eq!(
            err.to_string(),
            "backend rejected request (HTTP 503): maintenance"
        );
        let err = BackendError::NotFound { message: None };
        assert_eq!(err.to_string(), "assessment not found");
    }
}
