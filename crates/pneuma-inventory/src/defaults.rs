//! Inventory-wide connection defaults
//!
//! Applied after group folding to every device that still has no port or
//! timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Session and command timeout when neither device nor groups set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection defaults used by [`crate::Inventory::resolve_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveDefaults {
    /// Port for devices without one (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout for devices without one (default: 10s)
    #[serde(default = "default_timeout", with = "crate::model::duration_serde")]
    pub timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Default for ResolveDefaults {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ResolveDefaults {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
