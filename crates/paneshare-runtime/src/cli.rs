//! CLI definition using clap derive.

use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "paneshare", about = "Terminal sessions shared between an agent and humans")]
pub struct Cli {
    /// UDS socket path (default: /tmp/paneshare-$USER/paneshare.sock)
    #[arg(long, short = 's', global = true, env = "PANESHARE_SOCKET")]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the session server
    Serve(ServeOpts),
    /// Send one JSON-RPC request to a running server and print the result
    Call(CallOpts),
    /// List sessions of a running server
    List,
}

#[derive(clap::Args)]
pub struct ServeOpts {
    /// tmux binary
    #[arg(long, env = "PANESHARE_TMUX_BIN", default_value = "tmux")]
    pub tmux_bin: String,

    /// tmux socket name (-L) for persistent sessions
    #[arg(long, env = "PANESHARE_TMUX_SOCKET")]
    pub tmux_socket: Option<String>,

    /// Timeout per persistent-backend call in milliseconds
    #[arg(long, env = "PANESHARE_PERSISTENT_TIMEOUT_MS", default_value = "5000")]
    pub persistent_timeout_ms: u64,

    /// Timeout per direct-backend call in milliseconds
    #[arg(long, env = "PANESHARE_DIRECT_TIMEOUT_MS", default_value = "10000")]
    pub direct_timeout_ms: u64,

    /// Timeout of the tmux install probe in milliseconds
    #[arg(long, default_value = "2000")]
    pub probe_timeout_ms: u64,

    /// Pause before verifying a submitted line, in milliseconds
    #[arg(long, default_value = "500")]
    pub submit_settle_ms: u64,
}

impl ServeOpts {
    pub fn persistent_timeout(&self) -> Duration {
        Duration::from_millis(self.persistent_timeout_ms)
    }

    pub fn direct_timeout(&self) -> Duration {
        Duration::from_millis(self.direct_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_millis(self.submit_settle_ms)
    }
}

#[derive(clap::Args)]
pub struct CallOpts {
    /// Method name, e.g. create_session
    pub method: String,

    /// Parameters as a JSON object
    #[arg(default_value = "{}")]
    pub params: String,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/paneshare/paneshare.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/paneshare-{user}/paneshare.sock")
}
