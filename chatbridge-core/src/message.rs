//! Wire message types.
//!
//! Every frame is one compact JSON object tagged by `type`. Outbound
//! messages always carry the protocol version `v`; optional fields are
//! omitted from the encoded form rather than sent as `null`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol version stamped on every outbound message.
pub const PROTOCOL_VERSION: u32 = 1;

// ── Geometry ─────────────────────────────────────────────────────

/// Player position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Player view rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
}

/// Integer coordinates of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A snapshot of the player as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub position: Position,
    pub rotation: Rotation,
}

// ── OutboundMessage ──────────────────────────────────────────────

/// Messages sent from the bridge to the control process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// First frame of every connection.
    Hello {
        v: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret: Option<String>,
    },

    /// An intercepted chat command.
    Command {
        v: u32,
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },

    /// A periodic player state snapshot.
    State {
        v: u32,
        position: Position,
        rotation: Rotation,
        #[serde(
            rename = "lookingAt",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        looking_at: Option<BlockPos>,
    },
}

impl OutboundMessage {
    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Hello { .. } => "hello",
            OutboundMessage::Command { .. } => "command",
            OutboundMessage::State { .. } => "state",
        }
    }
}

// ── InboundMessage ───────────────────────────────────────────────

/// Control messages received from the control process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Informational acknowledgement. Extra fields are ignored.
    Ack,

    /// The remote rejected something; surfaced as a diagnostic.
    Error {
        #[serde(default)]
        code: serde_json::Value,
        #[serde(default)]
        message: String,
    },

    /// Any other `type`.
    #[serde(other)]
    Unknown,
}
