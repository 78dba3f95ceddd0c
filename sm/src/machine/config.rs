//! Machine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::registry::State;

/// State machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// State the machine starts in
    #[serde(rename = "initial-state", default)]
    pub initial_state: State,

    /// Default deadline for a submission to be accepted (unbounded when unset)
    #[serde(rename = "submit-timeout-ms", default)]
    pub submit_timeout_ms: Option<u64>,

    /// Default deadline for shutdown to be acknowledged (unbounded when unset)
    #[serde(rename = "close-timeout-ms", default)]
    pub close_timeout_ms: Option<u64>,

    /// Buffer size of the lifecycle notification channel
    #[serde(rename = "notify-capacity", default = "default_notify_capacity")]
    pub notify_capacity: usize,
}

fn default_notify_capacity() -> usize {
    debug!("default_notify_capacity: called");
    64
}

impl Default for MachineConfig {
    fn default() -> Self {
        debug!("MachineConfig::default: called");
        Self {
            initial_state: State::A,
            submit_timeout_ms: None,
            close_timeout_ms: None,
            notify_capacity: default_notify_capacity(),
        }
    }
}

impl MachineConfig {
    /// Get the default submission timeout as a Duration
    pub fn submit_timeout(&self) -> Option<Duration> {
        debug!(submit_timeout_ms = ?self.submit_timeout_ms, "MachineConfig::submit_timeout: called");
        self.submit_timeout_ms.map(Duration::from_millis)
    }

    /// Get the default shutdown timeout as a Duration
    pub fn close_timeout(&self) -> Option<Duration> {
        debug!(close_timeout_ms = ?self.close_timeout_ms, "MachineConfig::close_timeout: called");
        self.close_timeout_ms.map(Duration::from_millis)
    }
}
