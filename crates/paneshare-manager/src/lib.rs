//! paneshare-manager: the session manager.
//!
//! Composition root over the registry, pagination, control-mode and pane
//! hierarchy bookkeeping of `paneshare-core`, talking to backends only
//! through the `DirectBackend` / `PersistentBackend` traits. Every backend
//! call is bounded by a call-site timeout and no registry lock is held while
//! one is in flight.

pub mod config;
pub mod manager;
pub mod outcome;

pub use config::ManagerConfig;
pub use manager::SessionManager;
pub use outcome::{AttachInfo, SendOutcome, SendRoute, SessionStateView, SubmitOutcome};
