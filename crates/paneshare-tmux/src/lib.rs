//! paneshare-tmux: tmux IO boundary.
//! Provides subprocess execution with timeouts, the persistent multiplexer
//! backend, and a pane-level direct backend that drives a host tmux server.
//! No session bookkeeping lives here.

pub mod error;
pub mod executor;
pub mod pane_backend;
pub mod persistent;

pub use error::TmuxError;
pub use executor::{CommandRunner, TmuxExecutor};
pub use pane_backend::TmuxPaneBackend;
pub use persistent::{TmuxPersistentBackend, shell_quote};
