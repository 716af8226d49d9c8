use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::control::ControlMode;
use crate::error::SessionError;

// ─── Session Identity ─────────────────────────────────────────────

/// Opaque session identifier. Exchanged with callers in its canonical
/// hyphenated string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SessionError::InvalidIdentifier(s.to_string()))
    }
}

// ─── Session Record ───────────────────────────────────────────────

/// Bookkeeping for one terminal session, whichever backend hosts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Handle of the pane in the direct backend.
    pub direct_handle: Option<String>,
    /// Name of the multiplexer session in the persistent backend.
    pub persistent_handle: Option<String>,
    /// Effective start command (the attach wrapper for persistent sessions).
    pub command: Option<String>,
    pub output_buffer: Vec<String>,
    /// Next unread line for incremental reads. Never exceeds the buffer length.
    pub read_cursor: usize,
    pub control_mode: ControlMode,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<SessionId>,
    pub child_ids: Vec<SessionId>,
    /// Spatial label relative to the parent ("right", "bottom", ...).
    pub pane_position: Option<String>,
    pub window_id: Option<String>,
}

impl SessionRecord {
    /// Build a top-level record with a fresh identifier and empty buffer.
    pub fn new(
        direct_handle: Option<String>,
        persistent_handle: Option<String>,
        command: Option<String>,
    ) -> Self {
        let control_mode = ControlMode::initial(persistent_handle.is_some());
        Self {
            id: SessionId::new(),
            direct_handle,
            persistent_handle,
            command,
            output_buffer: Vec::new(),
            read_cursor: 0,
            control_mode,
            created_at: Utc::now(),
            parent_id: None,
            child_ids: Vec::new(),
            pane_position: None,
            window_id: None,
        }
    }

    #[must_use]
    pub fn with_window_id(mut self, window_id: Option<String>) -> Self {
        self.window_id = window_id;
        self
    }

    /// A record must be reachable through at least one backend.
    pub fn has_backend(&self) -> bool {
        self.direct_handle.is_some() || self.persistent_handle.is_some()
    }

    /// Summary view for listings, with runtime measured against `now`.
    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let runtime = now.signed_duration_since(self.created_at);
        SessionSummary {
            session_id: self.id,
            persistent_session: self.persistent_handle.clone(),
            command: self.command.clone(),
            control_mode: self.control_mode,
            created_at: self.created_at,
            runtime_seconds: runtime.num_milliseconds().max(0) as f64 / 1000.0,
            line_count: self.output_buffer.len(),
            parent_id: self.parent_id,
            pane_position: self.pane_position.clone(),
            child_count: self.child_ids.len(),
        }
    }
}

/// Listing entry returned by `list_sessions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub persistent_session: Option<String>,
    pub command: Option<String>,
    pub control_mode: ControlMode,
    pub created_at: DateTime<Utc>,
    pub runtime_seconds: f64,
    pub line_count: usize,
    pub parent_id: Option<SessionId>,
    pub pane_position: Option<String>,
    pub child_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrips_through_string() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().expect("canonical form parses");
        assert_eq!(parsed, id);
    }

    #[test]
    fn session_id_rejects_garbage() {
        let err = "not-a-session".parse::<SessionId>().unwrap_err();
        assert_eq!(err, SessionError::InvalidIdentifier("not-a-session".into()));
        assert_eq!(err.kind(), "invalid_identifier");
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let id = SessionId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn new_direct_record_defaults_to_agent() {
        let rec = SessionRecord::new(Some("%1".into()), None, Some("bash".into()));
        assert_eq!(rec.control_mode, ControlMode::Agent);
        assert!(rec.has_backend());
        assert_eq!(rec.read_cursor, 0);
        assert!(rec.child_ids.is_empty());
        assert!(rec.parent_id.is_none());
    }

    #[test]
    fn new_persistent_record_defaults_to_shared() {
        let rec = SessionRecord::new(Some("%1".into()), Some("build".into()), None);
        assert_eq!(rec.control_mode, ControlMode::Shared);
    }

    #[test]
    fn record_without_handles_has_no_backend() {
        let rec = SessionRecord::new(None, None, None);
        assert!(!rec.has_backend());
    }

    #[test]
    fn summary_reports_counts() {
        let mut rec = SessionRecord::new(Some("%1".into()), None, None);
        rec.output_buffer = vec!["a".into(), "b".into()];
        rec.child_ids.push(SessionId::new());
        rec.pane_position = Some("left".into());

        let later = rec.created_at + chrono::Duration::milliseconds(2500);
        let summary = rec.summary(later);
        assert_eq!(summary.session_id, rec.id);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.child_count, 1);
        assert_eq!(summary.pane_position.as_deref(), Some("left"));
        assert!((summary.runtime_seconds - 2.5).abs() < f64::EPSILON);
    }
}
