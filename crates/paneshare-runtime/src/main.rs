//! paneshare: session server binary and its command-line client.

use std::sync::Arc;

use clap::Parser;
use paneshare_manager::{ManagerConfig, SessionManager};
use paneshare_tmux::{TmuxExecutor, TmuxPaneBackend, TmuxPersistentBackend};

mod cli;
mod client;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Serve(opts) => {
            let filter = std::env::var("PANESHARE_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .with_writer(std::io::stderr)
                .init();

            tracing::info!("paneshare server starting");

            let manager = Arc::new(build_manager(&opts));
            if !manager.connect().await {
                tracing::warn!("host tmux server not reachable; will retry on first create");
            }
            server::run_server(&socket_path, manager, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("cannot listen for ctrl-c: {e}");
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutdown requested");
            })
            .await?;
        }
        cli::Command::Call(opts) => {
            client::cmd_call(&socket_path, &opts.method, &opts.params).await?;
        }
        cli::Command::List => {
            client::cmd_call(&socket_path, "list_sessions", "{}").await?;
        }
    }

    Ok(())
}

/// Wire the tmux backends into a manager.
///
/// Panes are opened in the user's own tmux server; persistent sessions live
/// on the server selected by `--tmux-socket`.
fn build_manager(opts: &cli::ServeOpts) -> SessionManager {
    let host = TmuxExecutor::new(opts.tmux_bin.clone());
    let persistent_exec = match opts.tmux_socket {
        Some(ref name) => TmuxExecutor::new(opts.tmux_bin.clone()).with_socket_name(name.clone()),
        None => TmuxExecutor::new(opts.tmux_bin.clone()),
    };

    let direct = TmuxPaneBackend::new(host).with_timeout(opts.direct_timeout());
    let persistent = TmuxPersistentBackend::new(persistent_exec)
        .with_timeouts(opts.persistent_timeout(), opts.probe_timeout());

    let config = ManagerConfig {
        direct_timeout: opts.direct_timeout(),
        persistent_timeout: opts.persistent_timeout(),
        submit_settle: opts.submit_settle(),
        ..ManagerConfig::default()
    };
    SessionManager::new(Arc::new(direct), Arc::new(persistent), config)
}
