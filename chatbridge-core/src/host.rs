//! Capabilities the embedding host supplies to the bridge.
//!
//! The bridge never renders anything itself: user-visible lines, the
//! normal chat path and world accessors all belong to the host.

use crate::message::{BlockPos, PlayerState};

/// Diagnostic output surfaced to the user.
pub trait Diagnostics: Send + Sync {
    /// A line shown directly to the user.
    fn echo(&self, line: &str);

    /// A line written to the host's log.
    fn log(&self, line: &str);
}

/// The full host contract used by the session driver.
pub trait Host: Diagnostics {
    /// Deliver `text` through the host's normal chat path.
    fn chat(&self, text: &str);

    /// Current player position and rotation, `None` while no world is
    /// loaded.
    fn player_state(&self) -> Option<PlayerState>;

    /// The block under the crosshair, if any.
    fn targeted_block(&self) -> Option<BlockPos>;
}

/// Events delivered by the host's interception layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// An outgoing chat line held back for inspection.
    OutgoingChat(String),

    /// The world listener reported a connectivity change.
    World { connected: bool },
}

/// Diagnostics sink that forwards to `tracing` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn echo(&self, line: &str) {
        tracing::info!(target: "chatbridge::echo", "{line}");
    }

    fn log(&self, line: &str) {
        tracing::debug!(target: "chatbridge::log", "{line}");
    }
}
