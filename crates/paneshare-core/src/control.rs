//! Control-mode arbitration: who currently drives a session.
//!
//! Advisory only. Any mode can be set from any mode; the arbiter never
//! blocks an operation, it only produces warnings for the caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Only the agent is expected to type.
    #[default]
    Agent,
    /// A human has taken over.
    Human,
    /// Both may type; a human can attach through the multiplexer.
    Shared,
}

impl ControlMode {
    pub const ALL: [Self; 3] = [Self::Agent, Self::Human, Self::Shared];

    /// Mode assigned at creation: persistent sessions start shared.
    pub fn initial(persistent: bool) -> Self {
        if persistent { Self::Shared } else { Self::Agent }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Human => "human",
            Self::Shared => "shared",
        }
    }

    /// Warning attached to a successful send when someone else may be typing.
    pub fn send_warning(self) -> Option<String> {
        match self {
            Self::Agent => None,
            Self::Human | Self::Shared => Some(format!(
                "Session is in {self} mode. User may also be typing commands."
            )),
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMode {
    type Err = SessionError;

    /// Accepts the canonical names plus the `claude`/`user` aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agent" | "claude" => Ok(Self::Agent),
            "human" | "user" => Ok(Self::Human),
            "shared" => Ok(Self::Shared),
            _ => Err(SessionError::UnsupportedOperation(format!(
                "unknown control mode: {s}"
            ))),
        }
    }
}
