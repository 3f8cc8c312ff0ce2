//! Domain-specific error types for the bridge.
//!
//! Transport failures are recovered inside the client and only ever
//! logged; these types surface where a caller can act on them
//! (configuration, start-up) and inside the lifecycle loop.

use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// The canonical error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // ── Configuration Errors ─────────────────────────────────────
    /// The endpoint could not be turned into a WebSocket request.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    // ── Transport Errors ─────────────────────────────────────────
    /// The WebSocket layer reported an error (connect, read or write).
    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    /// The underlying I/O layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The send queue was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding an outbound message failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    // ── State Errors ─────────────────────────────────────────────
    /// A connection phase transition was attempted from the wrong phase.
    #[error("invalid phase transition: cannot {action} from {from}")]
    InvalidTransition { action: &'static str, from: String },
}

// ── Convenient From implementations ──────────────────────────────

impl From<tungstenite::Error> for BridgeError {
    fn from(e: tungstenite::Error) -> Self {
        BridgeError::WebSocket(Box::new(e))
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BridgeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        BridgeError::ChannelClosed
    }
}
