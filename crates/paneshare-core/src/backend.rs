use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// A pane handed back by the direct backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectPane {
    /// Opaque backend reference used for every later call.
    pub handle: String,
    /// Enclosing window, when the backend knows it.
    pub window_id: Option<String>,
}

impl DirectPane {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            window_id: None,
        }
    }

    #[must_use]
    pub fn in_window(mut self, window_id: impl Into<String>) -> Self {
        self.window_id = Some(window_id.into());
        self
    }
}

/// Directly controlled terminal panes (create, type into, split, close).
///
/// Every call may suspend on IO. Implementations must not assume the caller
/// holds any lock.
#[async_trait]
pub trait DirectBackend: Send + Sync {
    /// Try to (re)connect. Returns whether the backend is usable afterwards.
    async fn connect(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// Open a new tab/window running `command` (or the default shell).
    async fn create_session(
        &self,
        command: Option<&str>,
        profile: Option<&str>,
    ) -> Result<DirectPane, BackendError>;

    async fn send_text(&self, handle: &str, text: &str) -> Result<(), BackendError>;

    /// Split `handle`; `vertical` places the new pane beside the old one.
    async fn split_pane(
        &self,
        handle: &str,
        vertical: bool,
        command: Option<&str>,
    ) -> Result<DirectPane, BackendError>;

    async fn close_session(&self, handle: &str) -> Result<(), BackendError>;

    async fn activate_session(&self, handle: &str) -> Result<(), BackendError>;

    /// Visible screen, top to bottom.
    async fn screen_contents(&self, handle: &str) -> Result<Vec<String>, BackendError>;

    /// Session variable such as `path`; `None` when the backend has no value.
    async fn get_variable(&self, handle: &str, name: &str) -> Result<Option<String>, BackendError>;
}

/// Multiplexer sessions that outlive this process and can be attached to
/// by a human.
#[async_trait]
pub trait PersistentBackend: Send + Sync {
    /// Check whether the multiplexer tool is installed. Callers memoize.
    async fn probe(&self) -> bool;

    /// Shell command that attaches to (or creates) `name`, optionally running
    /// `command` inside it.
    fn attach_command(&self, name: &str, command: Option<&str>) -> String;

    /// Command a human runs to join `name` from another terminal.
    fn human_attach_command(&self, name: &str) -> String;

    /// Attach-or-create `name` detached. Idempotent on the name.
    async fn new_session(&self, name: &str, command: Option<&str>) -> Result<(), BackendError>;

    /// Type `text` into `name`. A trailing newline is added when missing.
    async fn send_keys(&self, name: &str, text: &str) -> Result<(), BackendError>;

    /// Full visible buffer of `name`, one entry per line.
    async fn capture(&self, name: &str) -> Result<Vec<String>, BackendError>;

    async fn kill_session(&self, name: &str) -> Result<(), BackendError>;
}
