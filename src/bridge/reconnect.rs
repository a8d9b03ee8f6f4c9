//! Broker reconnect policy.
//!
//! Exponential backoff between attempts, capped, with a bounded number of
//! consecutive failures.  When the budget is spent the caller restarts the
//! board; a fresh boot also re-associates Wi-Fi, which a plain reconnect
//! does not.

use core::time::Duration;

use crate::config::BridgeConfig;

/// What to do after a failed connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    RetryAfter(Duration),
    Restart,
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_secs: u32,
    max_secs: u32,
    max_attempts: u32,
    failures: u32,
}

impl ReconnectPolicy {
    pub fn new(base_secs: u32, max_secs: u32, max_attempts: u32) -> Self {
        Self {
            base_secs,
            max_secs,
            max_attempts,
            failures: 0,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.reconnect_base_secs,
            config.reconnect_max_secs,
            config.max_reconnect_attempts,
        )
    }

    /// Record a failed connect.
    pub fn on_failure(&mut self) -> ReconnectAction {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.max_attempts {
            return ReconnectAction::Restart;
        }
        let shift = (self.failures - 1).min(31);
        let secs = self
            .base_secs
            .saturating_mul(1u32 << shift)
            .min(self.max_secs);
        ReconnectAction::RetryAfter(Duration::from_secs(secs as u64))
    }

    /// Record a successful connect; the backoff starts over.
    pub fn on_success(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
