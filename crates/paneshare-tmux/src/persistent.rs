//! Persistent backend: named tmux sessions a human can attach to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use paneshare_core::{BackendError, PersistentBackend};

use crate::error::TmuxError;
use crate::executor::{CommandRunner, TmuxExecutor};

/// Per-call timeout for session commands.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout of the install probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Quote `s` for a POSIX shell. Plain words are left alone.
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/' | b':' | b'@' | b'%' | b'+' | b'=' | b',')
        });
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Session target that disables tmux's prefix and pattern matching.
fn exact_session(name: &str) -> String {
    format!("={name}")
}

/// Active pane of the exactly named session.
fn exact_pane(name: &str) -> String {
    format!("={name}:")
}

pub struct TmuxPersistentBackend {
    tmux_bin: String,
    server_args: Vec<String>,
    runner: Arc<dyn CommandRunner>,
    call_timeout: Duration,
    probe_timeout: Duration,
}

impl TmuxPersistentBackend {
    /// Backend that shells out through `executor`.
    pub fn new(executor: TmuxExecutor) -> Self {
        Self {
            tmux_bin: executor.tmux_bin().to_string(),
            server_args: executor.server_args().into_iter().map(String::from).collect(),
            runner: Arc::new(executor),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Swap the process runner, keeping the composed command shape.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, call: Duration, probe: Duration) -> Self {
        self.call_timeout = call;
        self.probe_timeout = probe;
        self
    }

    fn tmux_prefix(&self) -> String {
        std::iter::once(self.tmux_bin.as_str())
            .chain(self.server_args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Wrapper commands run inside a tmux pane, possibly of the same server;
    /// tmux refuses to nest a client there unless `TMUX` is unset.
    fn client_prefix(&self) -> String {
        format!("env -u TMUX {}", self.tmux_prefix())
    }

    async fn run(&self, args: &[&str]) -> Result<String, BackendError> {
        self.runner.run(args, self.call_timeout).await.map_err(|e| {
            tracing::warn!(command = args.first().copied().unwrap_or_default(), error = %e, "tmux call failed");
            BackendError::from(e)
        })
    }
}

impl Default for TmuxPersistentBackend {
    fn default() -> Self {
        Self::new(TmuxExecutor::default())
    }
}

#[async_trait]
impl PersistentBackend for TmuxPersistentBackend {
    async fn probe(&self) -> bool {
        match self.runner.run(&["-V"], self.probe_timeout).await {
            Ok(version) => {
                tracing::info!(version = version.trim(), "tmux is available");
                true
            }
            Err(TmuxError::NotFound) => {
                tracing::warn!("tmux is not installed");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "error checking for tmux");
                false
            }
        }
    }

    fn attach_command(&self, name: &str, command: Option<&str>) -> String {
        let mut cmd = format!("{} new-session -A -s {}", self.client_prefix(), shell_quote(name));
        if let Some(command) = command.filter(|c| !c.is_empty()) {
            cmd.push(' ');
            cmd.push_str(&shell_quote(command));
        }
        cmd
    }

    fn human_attach_command(&self, name: &str) -> String {
        format!("{} attach -t {}", self.client_prefix(), shell_quote(&exact_session(name)))
    }

    async fn new_session(&self, name: &str, command: Option<&str>) -> Result<(), BackendError> {
        let target = exact_session(name);
        if self.runner.run(&["has-session", "-t", target.as_str()], self.call_timeout).await.is_ok() {
            tracing::debug!(session = name, "tmux session already exists");
            return Ok(());
        }
        let mut args = vec!["new-session", "-d", "-s", name];
        if let Some(command) = command.filter(|c| !c.is_empty()) {
            args.push(command);
        }
        self.run(&args).await?;
        tracing::info!(session = name, "created detached tmux session");
        Ok(())
    }

    async fn send_keys(&self, name: &str, text: &str) -> Result<(), BackendError> {
        let mut keys = text.to_string();
        if !keys.ends_with('\n') {
            keys.push('\n');
        }
        let target = exact_pane(name);
        self.run(&["send-keys", "-t", target.as_str(), keys.as_str()]).await?;
        tracing::debug!(session = name, "sent text via tmux");
        Ok(())
    }

    async fn capture(&self, name: &str) -> Result<Vec<String>, BackendError> {
        let target = exact_pane(name);
        let output = self.run(&["capture-pane", "-t", target.as_str(), "-p"]).await?;
        Ok(output.lines().map(String::from).collect())
    }

    async fn kill_session(&self, name: &str) -> Result<(), BackendError> {
        let target = exact_session(name);
        self.run(&["kill-session", "-t", target.as_str()]).await?;
        tracing::info!(session = name, "killed tmux session");
        Ok(())
    }
}
