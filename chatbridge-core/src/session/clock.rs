//! State sampling cadence.

use std::time::Duration;

use tokio::time::Instant;

/// Smallest interval accepted; shorter values are clamped.
pub const MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Tracks when the last state snapshot went out.
///
/// The next snapshot is due once `interval` has elapsed since the last
/// one. Marking stores the actual emission time rather than advancing
/// by a fixed step, so a slow loop never builds up a backlog: the
/// cadence is "at least every interval".
#[derive(Debug, Clone)]
pub struct SamplingClock {
    interval: Duration,
    last_emitted: Option<Instant>,
}

impl SamplingClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            last_emitted: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_emitted(&self) -> Option<Instant> {
        self.last_emitted
    }

    /// Whether a snapshot is due at `now`. Always due before the first
    /// emission.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_emitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record an emission at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_emitted = Some(now);
    }
}
