//! Reconnect backoff.
//!
//! The delay starts at the floor, doubles after every wait and is
//! capped at the maximum. Reaching the handshake resets it.

use std::time::Duration;

/// Floor and cap of the reconnect delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(5),
        }
    }
}

/// Running backoff state for one client lifecycle.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current: policy.initial,
        }
    }

    /// The delay the next wait would use.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return the delay to wait now and advance to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.policy.max);
        delay
    }

    /// Back to the floor after a successful handshake.
    pub fn reset(&mut self) {
        self.current = self.policy.initial;
    }
}
