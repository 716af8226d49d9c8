//! Parent/child bookkeeping for split panes.
//!
//! Splitting is a direct-backend capability. A child inherits the parent's
//! control mode and window; the parent only gains an entry in `child_ids`,
//! and only once the child record is stored. Removing a parent does not
//! touch its children: they keep a `parent_id` pointing at the gone record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::DirectPane;
use crate::error::SessionError;
use crate::registry::SessionRegistry;
use crate::types::{SessionId, SessionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitOrientation {
    /// New pane below the parent.
    Horizontal,
    /// New pane beside the parent.
    Vertical,
}

impl SplitOrientation {
    pub fn from_vertical(vertical: bool) -> Self {
        if vertical { Self::Vertical } else { Self::Horizontal }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Vertical)
    }

    /// Position label used when the caller does not supply one.
    pub fn default_position(self) -> &'static str {
        match self {
            Self::Horizontal => "bottom",
            Self::Vertical => "right",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

impl fmt::Display for SplitOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitOrientation {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            _ => Err(SessionError::UnsupportedOperation(format!(
                "unknown split orientation: {s}"
            ))),
        }
    }
}

/// Direct handle of `parent`, or why it cannot be split.
pub fn split_handle(parent: &SessionRecord) -> Result<&str, SessionError> {
    parent.direct_handle.as_deref().ok_or_else(|| {
        SessionError::UnsupportedOperation(format!(
            "session {} has no direct pane to split",
            parent.id
        ))
    })
}

/// Build the record for a pane split off `parent`.
///
/// The window is always the parent's, even when the backend reports one.
pub fn child_record(
    parent: &SessionRecord,
    pane: DirectPane,
    command: Option<String>,
    position: Option<String>,
) -> SessionRecord {
    let mut child = SessionRecord::new(Some(pane.handle), None, command);
    child.control_mode = parent.control_mode;
    child.parent_id = Some(parent.id);
    child.pane_position = position;
    child.window_id = parent.window_id.clone();
    child
}

impl SessionRegistry {
    /// Store `child` and link it under its parent.
    ///
    /// Fails without storing anything when the parent has disappeared in the
    /// meantime.
    pub fn insert_child(&self, child: SessionRecord) -> Result<SessionId, SessionError> {
        let parent_id = child.parent_id.ok_or_else(|| {
            SessionError::InvalidRecord("split child has no parent".into())
        })?;
        if !self.contains(&parent_id) {
            return Err(SessionError::SessionNotFound(parent_id));
        }
        let child_id = self.create(child)?;
        let linked = self.update(&parent_id, |parent| {
            if !parent.child_ids.contains(&child_id) {
                parent.child_ids.push(child_id);
            }
        });
        if linked.is_none() {
            self.remove(&child_id);
            return Err(SessionError::SessionNotFound(parent_id));
        }
        Ok(child_id)
    }

    /// Live children of `id`, in split order. Dangling ids are skipped.
    pub fn children(&self, id: &SessionId) -> Vec<SessionRecord> {
        let Some(parent) = self.get(id) else {
            return Vec::new();
        };
        parent
            .child_ids
            .iter()
            .filter_map(|child_id| self.get(child_id))
            .collect()
    }
}
