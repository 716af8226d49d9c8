//! Error types for session management and the backend facades.

use std::time::Duration;

use thiserror::Error;

use crate::types::SessionId;

/// Failure reported by a backend facade call.
///
/// Backends map their own transport errors onto this type; the manager then
/// folds it into [`SessionError`] for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend is not connected")]
    NotConnected,

    #[error("backend tool unavailable: {0}")]
    Unavailable(String),

    #[error("backend call failed: {0}")]
    CallFailed(String),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned by every session manager operation.
///
/// None of these is process-fatal. Adapters render them as
/// `kind(): message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("direct terminal backend is not connected")]
    BackendNotConnected,

    #[error("persistent backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("invalid session identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("backend call failed: {0}")]
    BackendCallFailed(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid session record: {0}")]
    InvalidRecord(String),
}

impl SessionError {
    /// Stable snake_case discriminant for wire protocols.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BackendNotConnected => "backend_not_connected",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::SessionNotFound(_) => "session_not_found",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::BackendCallFailed(_) => "backend_call_failed",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::InvalidRecord(_) => "invalid_record",
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotConnected => Self::BackendNotConnected,
            BackendError::Unavailable(detail) => Self::BackendUnavailable(detail),
            other @ (BackendError::CallFailed(_) | BackendError::Timeout(_)) => {
                Self::BackendCallFailed(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let id = SessionId::new();
        let errors = [
            SessionError::BackendNotConnected,
            SessionError::BackendUnavailable("x".into()),
            SessionError::SessionNotFound(id),
            SessionError::InvalidIdentifier("x".into()),
            SessionError::BackendCallFailed("x".into()),
            SessionError::UnsupportedOperation("x".into()),
            SessionError::InvalidRecord("x".into()),
        ];
        let mut kinds: Vec<&str> = errors.iter().map(SessionError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn timeout_maps_to_call_failed() {
        let err: SessionError = BackendError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(err.kind(), "backend_call_failed");
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }

    #[test]
    fn unavailable_keeps_detail() {
        let err: SessionError = BackendError::Unavailable("tmux not installed".into()).into();
        assert_eq!(
            err,
            SessionError::BackendUnavailable("tmux not installed".into())
        );
    }

    #[test]
    fn not_connected_maps_to_backend_not_connected() {
        let err: SessionError = BackendError::NotConnected.into();
        assert_eq!(err, SessionError::BackendNotConnected);
    }
}
