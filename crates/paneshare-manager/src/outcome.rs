//! Result payloads of manager operations that carry more than a record.

use serde::Serialize;

use paneshare_core::{ControlMode, SessionId};

/// Which backend carried a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendRoute {
    Persistent,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub session_id: SessionId,
    pub route: SendRoute,
    /// Set when someone besides the agent may be typing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub session_id: SessionId,
    pub route: SendRoute,
    /// `None` when verification was not requested or could not run.
    pub verified: Option<bool>,
    pub warnings: Vec<String>,
}

/// What a human needs to join a shared session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachInfo {
    pub session_id: SessionId,
    pub persistent_session: String,
    pub attach_command: String,
    pub control_mode: ControlMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStateView {
    pub session_id: SessionId,
    /// Working directory reported by the pane.
    pub path: Option<String>,
    pub recent_output: Vec<String>,
    pub pane_position: Option<String>,
    pub parent_id: Option<SessionId>,
    pub child_count: usize,
    pub control_mode: ControlMode,
}
