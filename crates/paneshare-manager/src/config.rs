use std::time::Duration;

use paneshare_core::DEFAULT_READ_LENGTH;

/// Tunables for [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Upper bound for any single direct-backend call.
    pub direct_timeout: Duration,
    /// Upper bound for any single persistent-backend call.
    pub persistent_timeout: Duration,
    /// Lines returned by a read that does not ask for a length.
    pub default_read_length: usize,
    /// Pause between submitting text and checking the screen for it.
    pub submit_settle: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            direct_timeout: Duration::from_secs(10),
            persistent_timeout: Duration::from_secs(5),
            default_read_length: DEFAULT_READ_LENGTH,
            submit_settle: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.default_read_length, 1000);
        assert_eq!(config.persistent_timeout, Duration::from_secs(5));
        assert!(config.direct_timeout >= config.persistent_timeout);
    }
}
