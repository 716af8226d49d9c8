//! CommandRunner trait and TmuxExecutor (async subprocess wrapper).
//! The trait is the seam tests use to inject a fake tmux.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::TmuxError;

/// Runs one tmux invocation and returns its stdout.
///
/// A nonzero exit is `CommandFailed`; exceeding `timeout` is `Timeout` and
/// the child is killed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, TmuxError>;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, TmuxError> {
        (**self).run(args, timeout).await
    }
}

/// Real tmux executor using `tokio::process::Command`.
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    tmux_bin: String,
    socket_path: Option<String>,
    socket_name: Option<String>,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
            socket_path: None,
            socket_name: None,
        }
    }

    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket_name = Some(name.into());
        self
    }

    pub fn tmux_bin(&self) -> &str {
        &self.tmux_bin
    }

    /// Server selection flags. Socket path takes precedence over socket name.
    pub fn server_args(&self) -> Vec<&str> {
        if let Some(ref path) = self.socket_path {
            vec!["-S", path.as_str()]
        } else if let Some(ref name) = self.socket_name {
            vec!["-L", name.as_str()]
        } else {
            Vec::new()
        }
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new("tmux")
    }
}

#[async_trait]
impl CommandRunner for TmuxExecutor {
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, TmuxError> {
        let mut cmd = Command::new(&self.tmux_bin);
        cmd.args(self.server_args()).args(args).kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TmuxError::NotFound);
            }
            Ok(Err(e)) => return Err(TmuxError::Io(e)),
            Err(_) => {
                return Err(TmuxError::Timeout {
                    command: args.first().copied().unwrap_or_default().to_string(),
                    after: timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::CommandFailed(format!(
                "exit {}: {}",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".into()),
                stderr.trim(),
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
