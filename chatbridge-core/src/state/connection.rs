//! Connection phase machine for the transport client.
//!
//! Models one connect attempt cycle with validated transitions that
//! return `Result` instead of panicking.

use std::time::Instant;

use crate::error::BridgeError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of a bridge connection.
///
/// ```text
///  Disconnected ──► Connecting ──► Handshaking ──► Streaming
///       ▲                │               │             │
///       │                ▼               ▼             ▼
///       └──────────── Failed ◄───────────┘          Closing
///       └──────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No socket held. Initial / rest state.
    #[default]
    Disconnected,

    /// Opening the WebSocket connection.
    Connecting,

    /// Socket is up; sending the Hello frame.
    Handshaking,

    /// Sender and receiver loops are running.
    Streaming {
        /// When the connection entered `Streaming`.
        since: Instant,
    },

    /// Streaming ended; the socket is being closed.
    Closing,

    /// The attempt failed before or during the handshake.
    Failed,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Streaming { .. } => write!(f, "Streaming"),
            Self::Closing => write!(f, "Closing"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl ConnectionPhase {
    /// Returns `true` in the rest state.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the connection has been streaming.
    ///
    /// Returns `None` for any other phase.
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Streaming { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(self.rejected("connect")),
        }
    }

    /// Transition to `Handshaking`.
    ///
    /// Valid from: `Connecting`.
    pub fn begin_handshake(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Connecting => {
                *self = Self::Handshaking;
                Ok(())
            }
            _ => Err(self.rejected("handshake")),
        }
    }

    /// Transition to `Streaming`.
    ///
    /// Valid from: `Handshaking`.
    pub fn begin_streaming(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Handshaking => {
                *self = Self::Streaming {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(self.rejected("stream")),
        }
    }

    /// Transition to `Closing`.
    ///
    /// Valid from: `Streaming`.
    pub fn begin_close(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Streaming { .. } => {
                *self = Self::Closing;
                Ok(())
            }
            _ => Err(self.rejected("close")),
        }
    }

    /// Transition to `Failed`.
    ///
    /// Valid from: `Connecting`, `Handshaking`.
    pub fn fail(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Connecting | Self::Handshaking => {
                *self = Self::Failed;
                Ok(())
            }
            _ => Err(self.rejected("fail")),
        }
    }

    /// Transition back to `Disconnected`.
    ///
    /// Valid from: `Closing`, `Failed`.
    pub fn finish(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Closing | Self::Failed => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(self.rejected("finish")),
        }
    }

    fn rejected(&self, action: &'static str) -> BridgeError {
        BridgeError::InvalidTransition {
            action,
            from: self.to_string(),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Used when a stop request interrupts an attempt mid-phase.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
