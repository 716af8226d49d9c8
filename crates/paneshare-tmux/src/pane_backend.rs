//! Direct backend that drives windows and panes of a host tmux server.
//!
//! Pane ids (`%N`) are the opaque handles; window ids (`@N`) are reported so
//! split children can inherit them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use paneshare_core::{BackendError, DirectBackend, DirectPane};

use crate::error::TmuxError;
use crate::executor::{CommandRunner, TmuxExecutor};

/// Per-call timeout for pane commands.
pub const DEFAULT_PANE_TIMEOUT: Duration = Duration::from_secs(10);

/// `-F` format printed by `new-window -P` and `split-window -P`.
const PANE_FMT: &str = "#{pane_id}\t#{window_id}";

pub struct TmuxPaneBackend {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    connected: AtomicBool,
}

impl TmuxPaneBackend {
    pub fn new(executor: TmuxExecutor) -> Self {
        Self::with_runner(Arc::new(executor))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: DEFAULT_PANE_TIMEOUT,
            connected: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, BackendError> {
        if !self.is_connected() {
            return Err(BackendError::NotConnected);
        }
        self.runner.run(args, self.timeout).await.map_err(|e| {
            tracing::warn!(command = args.first().copied().unwrap_or_default(), error = %e, "tmux pane call failed");
            BackendError::from(e)
        })
    }
}

impl Default for TmuxPaneBackend {
    fn default() -> Self {
        Self::new(TmuxExecutor::default())
    }
}

/// Parse the `PANE_FMT` line printed for a new pane.
fn parse_new_pane(output: &str) -> Result<DirectPane, TmuxError> {
    let line = output.lines().next().unwrap_or_default().trim();
    let mut parts = line.splitn(2, '\t');
    let pane_id = parts.next().unwrap_or_default();
    if !is_pane_id(pane_id) {
        return Err(TmuxError::Parse(format!("expected a pane id, got: {line:?}")));
    }
    let pane = DirectPane::new(pane_id);
    Ok(match parts.next().map(str::trim).filter(|w| !w.is_empty()) {
        Some(window_id) => pane.in_window(window_id),
        None => pane,
    })
}

/// `%<digits>`, the tmux pane id format.
fn is_pane_id(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('%') && s[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Map a session variable name onto a tmux format variable.
fn format_variable(name: &str) -> Option<String> {
    let var = match name {
        "path" | "cwd" => "pane_current_path",
        "pid" => "pane_pid",
        "command" => "pane_current_command",
        "title" => "pane_title",
        other => other,
    };
    let valid = !var.is_empty() && var.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
    valid.then(|| format!("#{{{var}}}"))
}

#[async_trait]
impl DirectBackend for TmuxPaneBackend {
    async fn connect(&self) -> bool {
        let ok = match self.runner.run(&["list-sessions", "-F", "#{session_id}"], self.timeout).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "cannot reach host tmux server");
                false
            }
        };
        self.connected.store(ok, Ordering::SeqCst);
        if ok {
            tracing::info!("connected to host tmux server");
        }
        ok
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn create_session(
        &self,
        command: Option<&str>,
        profile: Option<&str>,
    ) -> Result<DirectPane, BackendError> {
        // The profile names the host session that receives the new window.
        let target = profile.map(|p| format!("{p}:"));
        let mut args = vec!["new-window", "-P", "-F", PANE_FMT];
        if let Some(ref target) = target {
            args.extend(["-t", target.as_str()]);
        }
        if let Some(command) = command.filter(|c| !c.is_empty()) {
            args.push(command);
        }
        let output = self.run(&args).await?;
        let pane = parse_new_pane(&output)?;
        tracing::info!(pane_id = %pane.handle, window_id = ?pane.window_id, "created tmux window");
        Ok(pane)
    }

    async fn send_text(&self, handle: &str, text: &str) -> Result<(), BackendError> {
        self.run(&["send-keys", "-t", handle, "-l", text]).await?;
        Ok(())
    }

    async fn split_pane(
        &self,
        handle: &str,
        vertical: bool,
        command: Option<&str>,
    ) -> Result<DirectPane, BackendError> {
        // A vertical divider puts the panes side by side: tmux `-h`.
        let direction = if vertical { "-h" } else { "-v" };
        let output = self
            .run(&["split-window", direction, "-t", handle, "-P", "-F", PANE_FMT])
            .await?;
        let pane = parse_new_pane(&output)?;
        if let Some(command) = command.filter(|c| !c.is_empty()) {
            self.send_text(&pane.handle, &format!("{command}\n")).await?;
        }
        tracing::info!(
            parent = handle,
            pane_id = %pane.handle,
            vertical,
            "split tmux pane"
        );
        Ok(pane)
    }

    async fn close_session(&self, handle: &str) -> Result<(), BackendError> {
        self.run(&["kill-pane", "-t", handle]).await?;
        Ok(())
    }

    async fn activate_session(&self, handle: &str) -> Result<(), BackendError> {
        self.run(&["select-window", "-t", handle]).await?;
        self.run(&["select-pane", "-t", handle]).await?;
        Ok(())
    }

    async fn screen_contents(&self, handle: &str) -> Result<Vec<String>, BackendError> {
        let output = self.run(&["capture-pane", "-p", "-t", handle]).await?;
        Ok(output.lines().map(String::from).collect())
    }

    async fn get_variable(&self, handle: &str, name: &str) -> Result<Option<String>, BackendError> {
        let Some(format) = format_variable(name) else {
            return Ok(None);
        };
        let output = self
            .run(&["display-message", "-p", "-t", handle, format.as_str()])
            .await?;
        let value = output.trim_end_matches('\n');
        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}
