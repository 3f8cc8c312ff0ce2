//! Message construction and frame (de)serialisation.
//!
//! Pure functions only: nothing here touches the network.

use tracing::trace;

use crate::error::BridgeError;
use crate::message::{
    BlockPos, InboundMessage, OutboundMessage, PROTOCOL_VERSION, Position, Rotation,
};

/// Build the handshake message. An empty secret is left out entirely.
pub fn build_hello(version: u32, secret: Option<&str>) -> OutboundMessage {
    OutboundMessage::Hello {
        v: version,
        secret: secret.filter(|s| !s.is_empty()).map(str::to_owned),
    }
}

/// Build a command message for `verb` with its raw arguments.
pub fn build_command(verb: &str, args: &[String]) -> OutboundMessage {
    OutboundMessage::Command {
        v: PROTOCOL_VERSION,
        name: verb.to_owned(),
        args: args.to_vec(),
    }
}

/// Build a state snapshot. `target_block` is `None` when the player is
/// not looking at a block, which is distinct from looking at the origin.
pub fn build_state(
    position: Position,
    rotation: Rotation,
    target_block: Option<BlockPos>,
) -> OutboundMessage {
    OutboundMessage::State {
        v: PROTOCOL_VERSION,
        position,
        rotation,
        looking_at: target_block,
    }
}

/// Serialise a message into a compact JSON text frame.
pub fn encode(message: &OutboundMessage) -> Result<String, BridgeError> {
    Ok(serde_json::to_string(message)?)
}

/// Best-effort decode of an inbound text frame.
///
/// Anything that is not a JSON object with a string `type` yields
/// `None`; the caller drops the frame and keeps reading.
pub fn decode(text: &str) -> Option<InboundMessage> {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            trace!("discarding undecodable frame: {e}");
            None
        }
    }
}

/// Best-effort decode of an inbound binary frame (UTF-8 JSON).
pub fn decode_bytes(data: &[u8]) -> Option<InboundMessage> {
    std::str::from_utf8(data).ok().and_then(decode)
}

/// Render an error `code` the way it reads in a diagnostic line.
pub fn describe_code(code: &serde_json::Value) -> String {
    match code {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────
