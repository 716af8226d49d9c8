//! paneshare-core: session bookkeeping shared by every paneshare crate.
//!
//! Holds the session data model, the error taxonomy, the in-memory session
//! registry, output pagination, control-mode arbitration and pane hierarchy
//! helpers. Backends are consumed through the traits in [`backend`]; nothing
//! in this crate spawns processes or talks to a terminal.

pub mod backend;
pub mod control;
pub mod error;
pub mod hierarchy;
pub mod pagination;
pub mod registry;
pub mod types;

pub use backend::{DirectBackend, DirectPane, PersistentBackend};
pub use control::ControlMode;
pub use error::{BackendError, SessionError};
pub use hierarchy::SplitOrientation;
pub use pagination::{DEFAULT_READ_LENGTH, OutputPage, ReadMode};
pub use registry::SessionRegistry;
pub use types::{SessionId, SessionRecord, SessionSummary};
