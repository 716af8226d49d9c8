//! Error types for the tmux backend.

use std::time::Duration;

use paneshare_core::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux command failed: {0}")]
    CommandFailed(String),

    #[error("tmux not found")]
    NotFound,

    #[error("tmux {command} timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("unexpected tmux output: {0}")]
    Parse(String),

    #[error("tmux io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TmuxError> for BackendError {
    fn from(err: TmuxError) -> Self {
        match err {
            TmuxError::NotFound => Self::Unavailable("tmux is not installed".into()),
            TmuxError::Timeout { after, .. } => Self::Timeout(after),
            other => Self::CallFailed(other.to_string()),
        }
    }
}
