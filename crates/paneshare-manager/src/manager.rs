//! Session manager: orchestrates backends around the registry.
//!
//! Every operation follows the same shape: snapshot the record, release the
//! registry lock, talk to a backend under a timeout, then re-enter the
//! registry to commit. A record that vanished during the backend call is
//! reported as `SessionNotFound` and nothing is committed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OnceCell;

use paneshare_core::hierarchy::{child_record, split_handle};
use paneshare_core::{
    BackendError, ControlMode, DirectBackend, OutputPage, PersistentBackend, SessionError,
    SessionId, SessionRecord, SessionRegistry, SessionSummary, SplitOrientation,
};

use crate::config::ManagerConfig;
use crate::outcome::{AttachInfo, SendOutcome, SendRoute, SessionStateView, SubmitOutcome};

/// Screen lines inspected when verifying a submission.
const VERIFY_WINDOW_LINES: usize = 5;
/// Leading characters of the submitted text looked for on screen.
const VERIFY_PREFIX_CHARS: usize = 50;
/// Screen lines considered for the state snapshot.
const STATE_RECENT_LINES: usize = 10;

pub struct SessionManager {
    registry: SessionRegistry,
    direct: Arc<dyn DirectBackend>,
    persistent: Arc<dyn PersistentBackend>,
    persistent_available: OnceCell<bool>,
    config: ManagerConfig,
}

impl SessionManager {
    pub fn new(
        direct: Arc<dyn DirectBackend>,
        persistent: Arc<dyn PersistentBackend>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            direct,
            persistent,
            persistent_available: OnceCell::new(),
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // ─── Backend plumbing ─────────────────────────────────────────

    /// Connect the direct backend. Returns whether it is usable.
    pub async fn connect(&self) -> bool {
        match tokio::time::timeout(self.config.direct_timeout, self.direct.connect()).await {
            Ok(connected) => connected,
            Err(_) => {
                tracing::error!(timeout = ?self.config.direct_timeout, "direct backend connect timed out");
                false
            }
        }
    }

    /// Whether the persistent tool is installed. Probed once per manager.
    pub async fn persistent_available(&self) -> bool {
        *self
            .persistent_available
            .get_or_init(|| async {
                let available = self.persistent.probe().await;
                tracing::info!(available, "probed persistent backend");
                available
            })
            .await
    }

    async fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.direct.is_connected() || self.connect().await {
            Ok(())
        } else {
            Err(SessionError::BackendNotConnected)
        }
    }

    async fn ensure_persistent(&self) -> Result<(), SessionError> {
        if self.persistent_available().await {
            Ok(())
        } else {
            Err(SessionError::BackendUnavailable("tmux is not installed".into()))
        }
    }

    async fn direct_call<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, SessionError> {
        bounded(op, self.config.direct_timeout, call).await
    }

    async fn persistent_call<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, SessionError> {
        bounded(op, self.config.persistent_timeout, call).await
    }

    fn snapshot(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.registry.get(id).ok_or(SessionError::SessionNotFound(*id))
    }

    // ─── Creation ─────────────────────────────────────────────────

    /// Open a new direct pane, optionally wrapping it in a persistent
    /// session named `persistent_name`.
    pub async fn create_session(
        &self,
        command: Option<&str>,
        persistent_name: Option<&str>,
        profile: Option<&str>,
    ) -> Result<SessionRecord, SessionError> {
        self.ensure_connected().await?;

        let command = command.filter(|c| !c.is_empty());
        let effective = match persistent_name {
            Some(name) => {
                validate_persistent_name(name)?;
                self.ensure_persistent().await?;
                Some(self.persistent.attach_command(name, command))
            }
            None => command.map(String::from),
        };

        let pane = self
            .direct_call(
                "create_session",
                self.direct.create_session(effective.as_deref(), profile),
            )
            .await?;

        let record = SessionRecord::new(
            Some(pane.handle),
            persistent_name.map(String::from),
            effective,
        )
        .with_window_id(pane.window_id);
        self.commit_new(record)
    }

    /// Persistent session shown in a direct pane, shared with humans from
    /// the start.
    pub async fn create_shared_session(
        &self,
        name: &str,
        command: Option<&str>,
    ) -> Result<SessionRecord, SessionError> {
        self.create_session(command, Some(name), None).await
    }

    /// Persistent session with no direct pane. Humans can attach to it, but
    /// it cannot be split or focused.
    pub async fn create_detached_session(
        &self,
        name: &str,
        command: Option<&str>,
    ) -> Result<SessionRecord, SessionError> {
        validate_persistent_name(name)?;
        self.ensure_persistent().await?;

        let command = command.filter(|c| !c.is_empty());
        self.persistent_call("new_session", self.persistent.new_session(name, command))
            .await?;

        let record = SessionRecord::new(None, Some(name.to_string()), command.map(String::from));
        self.commit_new(record)
    }

    fn commit_new(&self, mut record: SessionRecord) -> Result<SessionRecord, SessionError> {
        let id = self.registry.create(record.clone())?;
        record.id = id;
        tracing::info!(
            session_id = %id,
            persistent = record.persistent_handle.as_deref(),
            mode = %record.control_mode,
            "created session"
        );
        Ok(record)
    }

    // ─── Input ────────────────────────────────────────────────────

    /// Type `text` into the session.
    ///
    /// Persistent sessions are written through the multiplexer, falling back
    /// to the direct pane when that fails. Direct-only sessions echo the text
    /// into their local buffer.
    pub async fn send_to_session(
        &self,
        id: &SessionId,
        text: &str,
    ) -> Result<SendOutcome, SessionError> {
        let record = self.snapshot(id)?;
        let route = self.deliver(&record, text).await?;
        Ok(SendOutcome {
            session_id: record.id,
            route,
            warning: record.control_mode.send_warning(),
        })
    }

    /// Send `text` and press Enter, optionally checking that it reached the
    /// screen.
    pub async fn send_and_submit(
        &self,
        id: &SessionId,
        text: &str,
        verify: bool,
    ) -> Result<SubmitOutcome, SessionError> {
        let record = self.snapshot(id)?;
        let route = self.deliver(&record, text).await?;
        if route == SendRoute::Direct {
            // The multiplexer path already ends the line.
            let handle = record.direct_handle.as_deref().unwrap_or_default();
            self.direct_call("send_text", self.direct.send_text(handle, "\r"))
                .await?;
        }

        let mut warnings: Vec<String> = record.control_mode.send_warning().into_iter().collect();
        let verified = if verify {
            tokio::time::sleep(self.config.submit_settle).await;
            match self.screen_tail(&record, route, VERIFY_WINDOW_LINES).await {
                Ok(tail) => {
                    let found = submitted_on_screen(text, &tail);
                    if !found {
                        warnings.push("Submitted text was not found on screen".into());
                    }
                    Some(found)
                }
                Err(e) => {
                    tracing::warn!(session_id = %record.id, error = %e, "could not verify submission");
                    warnings.push(format!("Could not verify text submission: {e}"));
                    None
                }
            }
        } else {
            None
        };

        Ok(SubmitOutcome {
            session_id: record.id,
            route,
            verified,
            warnings,
        })
    }

    async fn deliver(&self, record: &SessionRecord, text: &str) -> Result<SendRoute, SessionError> {
        if let Some(name) = record.persistent_handle.as_deref() {
            if self.persistent_available().await {
                match self
                    .persistent_call("send_keys", self.persistent.send_keys(name, text))
                    .await
                {
                    Ok(()) => {
                        tracing::debug!(session_id = %record.id, "sent via persistent backend");
                        return Ok(SendRoute::Persistent);
                    }
                    Err(e) if record.direct_handle.is_some() => {
                        tracing::warn!(
                            session_id = %record.id,
                            error = %e,
                            "persistent send failed, falling back to direct pane"
                        );
                    }
                    Err(e) => return Err(e),
                }
            } else if record.direct_handle.is_none() {
                return Err(SessionError::BackendUnavailable("tmux is not installed".into()));
            }
        }

        let Some(handle) = record.direct_handle.as_deref() else {
            return Err(SessionError::UnsupportedOperation(format!(
                "session {} has no backend to send to",
                record.id
            )));
        };
        self.direct_call("send_text", self.direct.send_text(handle, text))
            .await?;

        if record.persistent_handle.is_none() {
            let echoed = self.registry.update(&record.id, |rec| {
                rec.append_output(text.lines());
            });
            if echoed.is_none() {
                return Err(SessionError::SessionNotFound(record.id));
            }
        }
        tracing::debug!(session_id = %record.id, "sent via direct backend");
        Ok(SendRoute::Direct)
    }

    async fn screen_tail(
        &self,
        record: &SessionRecord,
        route: SendRoute,
        lines: usize,
    ) -> Result<Vec<String>, SessionError> {
        let screen = match (route, record.direct_handle.as_deref()) {
            (SendRoute::Direct, Some(handle)) => {
                self.direct_call("screen_contents", self.direct.screen_contents(handle))
                    .await?
            }
            _ => {
                let name = record.persistent_handle.as_deref().unwrap_or_default();
                self.persistent_call("capture", self.persistent.capture(name))
                    .await?
            }
        };
        let skip = screen.len().saturating_sub(lines);
        Ok(screen.into_iter().skip(skip).collect())
    }

    // ─── Output ───────────────────────────────────────────────────

    /// Read a page of output. `offset` 0 continues from the read cursor,
    /// positive is an absolute line index, negative counts from the end.
    ///
    /// Persistent sessions are re-captured first; a failed capture is an
    /// error rather than a stale page.
    pub async fn read_session_output(
        &self,
        id: &SessionId,
        offset: i64,
        length: Option<usize>,
    ) -> Result<OutputPage, SessionError> {
        let record = self.snapshot(id)?;
        let captured = match record.persistent_handle.as_deref() {
            Some(name) => {
                self.ensure_persistent().await?;
                Some(
                    self.persistent_call("capture", self.persistent.capture(name))
                        .await?,
                )
            }
            None => None,
        };

        let length = length.unwrap_or(self.config.default_read_length);
        self.registry
            .update(id, |rec| {
                if let Some(lines) = captured {
                    rec.replace_output(lines);
                }
                rec.paginate(offset, length)
            })
            .ok_or(SessionError::SessionNotFound(*id))
    }

    /// Append lines to a session's buffer without touching any backend.
    pub fn append_output(&self, id: &SessionId, lines: Vec<String>) -> Result<(), SessionError> {
        self.registry
            .update(id, |rec| rec.append_output(lines))
            .ok_or(SessionError::SessionNotFound(*id))
    }

    // ─── Queries ──────────────────────────────────────────────────

    pub fn get_record(&self, id: &SessionId) -> Option<SessionRecord> {
        self.registry.get(id)
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let now = Utc::now();
        self.registry.list().iter().map(|rec| rec.summary(now)).collect()
    }

    /// Working directory, recent screen lines and placement of a pane.
    pub async fn session_state(&self, id: &SessionId) -> Result<SessionStateView, SessionError> {
        let record = self.snapshot(id)?;
        let handle = record.direct_handle.as_deref().ok_or_else(|| {
            SessionError::UnsupportedOperation(format!("session {id} has no direct pane"))
        })?;

        let path = self
            .direct_call("get_variable", self.direct.get_variable(handle, "path"))
            .await?;
        let screen = self
            .direct_call("screen_contents", self.direct.screen_contents(handle))
            .await?;
        let skip = screen.len().saturating_sub(STATE_RECENT_LINES);
        let recent_output = screen
            .into_iter()
            .skip(skip)
            .filter(|line| !line.trim().is_empty())
            .collect();

        Ok(SessionStateView {
            session_id: record.id,
            path,
            recent_output,
            pane_position: record.pane_position,
            parent_id: record.parent_id,
            child_count: record.child_ids.len(),
            control_mode: record.control_mode,
        })
    }

    // ─── Control ──────────────────────────────────────────────────

    pub fn set_control_mode(&self, id: &SessionId, mode: ControlMode) -> Result<(), SessionError> {
        let previous = self
            .registry
            .update(id, |rec| std::mem::replace(&mut rec.control_mode, mode))
            .ok_or(SessionError::SessionNotFound(*id))?;
        tracing::info!(session_id = %id, from = %previous, to = %mode, "control mode changed");
        Ok(())
    }

    /// Switch a persistent session to shared mode and describe how a human
    /// joins it.
    pub fn prepare_attach(&self, id: &SessionId) -> Result<AttachInfo, SessionError> {
        let record = self.snapshot(id)?;
        let Some(name) = record.persistent_handle else {
            return Err(SessionError::UnsupportedOperation(format!(
                "session {id} is not persistent; create it with a persistent name to share it"
            )));
        };
        self.set_control_mode(id, ControlMode::Shared)?;
        Ok(AttachInfo {
            session_id: record.id,
            attach_command: self.persistent.human_attach_command(&name),
            persistent_session: name,
            control_mode: ControlMode::Shared,
        })
    }

    // ─── Panes ────────────────────────────────────────────────────

    /// Split the session's pane and register the new pane as its child.
    ///
    /// Without a `position` the label follows the orientation: "bottom" for
    /// horizontal, "right" for vertical.
    pub async fn split_session(
        &self,
        id: &SessionId,
        orientation: SplitOrientation,
        command: Option<&str>,
        position: Option<&str>,
    ) -> Result<SessionRecord, SessionError> {
        let parent = self.snapshot(id)?;
        let handle = split_handle(&parent)?.to_string();
        let command = command.filter(|c| !c.is_empty());

        let pane = self
            .direct_call(
                "split_pane",
                self.direct.split_pane(&handle, orientation.is_vertical(), command),
            )
            .await?;

        let position = position.unwrap_or_else(|| orientation.default_position());
        // Re-read so the child copies the parent's mode as of now.
        let Some(parent) = self.registry.get(id) else {
            self.discard_pane(&pane.handle).await;
            return Err(SessionError::SessionNotFound(*id));
        };
        let new_pane = pane.handle.clone();
        let child = child_record(
            &parent,
            pane,
            command.map(String::from),
            Some(position.to_string()),
        );
        let child_id = match self.registry.insert_child(child) {
            Ok(child_id) => child_id,
            Err(e) => {
                self.discard_pane(&new_pane).await;
                return Err(e);
            }
        };
        tracing::info!(
            parent = %id,
            child = %child_id,
            orientation = %orientation,
            position,
            "split session"
        );
        self.snapshot(&child_id)
    }

    async fn discard_pane(&self, handle: &str) {
        if let Err(e) = self
            .direct_call("close_session", self.direct.close_session(handle))
            .await
        {
            tracing::warn!(pane = handle, error = %e, "failed to close orphaned pane");
        }
    }

    /// Bring the session's pane to the front.
    pub async fn focus_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let record = self.snapshot(id)?;
        let handle = record.direct_handle.as_deref().ok_or_else(|| {
            SessionError::UnsupportedOperation(format!("session {id} has no direct pane to focus"))
        })?;
        self.direct_call("activate_session", self.direct.activate_session(handle))
            .await
    }

    // ─── Teardown ─────────────────────────────────────────────────

    /// Forget the session, killing its persistent session first.
    ///
    /// A failed kill is logged and does not keep the record alive. Children
    /// of the session are left in place.
    pub async fn terminate_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let record = self.snapshot(id)?;
        self.kill_persistent(&record).await;
        self.forget(id)
    }

    /// Terminate the session and also close its direct pane.
    pub async fn close_pane(&self, id: &SessionId) -> Result<(), SessionError> {
        let record = self.snapshot(id)?;
        self.kill_persistent(&record).await;
        if let Some(handle) = record.direct_handle.as_deref() {
            self.discard_pane(handle).await;
        }
        self.forget(id)
    }

    async fn kill_persistent(&self, record: &SessionRecord) {
        let Some(name) = record.persistent_handle.as_deref() else {
            return;
        };
        if !self.persistent_available().await {
            return;
        }
        if let Err(e) = self
            .persistent_call("kill_session", self.persistent.kill_session(name))
            .await
        {
            tracing::warn!(session_id = %record.id, persistent = name, error = %e, "failed to kill persistent session");
        }
    }

    fn forget(&self, id: &SessionId) -> Result<(), SessionError> {
        if !self.registry.remove(id) {
            return Err(SessionError::SessionNotFound(*id));
        }
        tracing::info!(session_id = %id, "terminated session");
        Ok(())
    }
}

/// Run a backend call under `limit`, logging failures.
async fn bounded<T>(
    op: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, SessionError> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(op, error = %e, "backend call failed");
            Err(e.into())
        }
        Err(_) => {
            tracing::warn!(op, timeout = ?limit, "backend call timed out");
            Err(BackendError::Timeout(limit).into())
        }
    }
}

/// tmux rejects empty names and treats `:` and `.` as target separators.
fn validate_persistent_name(name: &str) -> Result<(), SessionError> {
    if name.trim().is_empty() || name.contains([':', '.']) {
        return Err(SessionError::UnsupportedOperation(format!(
            "invalid persistent session name: {name:?}"
        )));
    }
    Ok(())
}

fn submitted_on_screen(text: &str, tail: &[String]) -> bool {
    let needle: String = text.trim_end().chars().take(VERIFY_PREFIX_CHARS).collect();
    if needle.is_empty() {
        return true;
    }
    tail.join("\n").contains(&needle)
}
