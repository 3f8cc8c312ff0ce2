//! # chatbridge-core
//!
//! Core library for the chat command bridge.
//!
//! This crate contains:
//! - **Wire types**: `OutboundMessage`, `InboundMessage` and the geometry they carry
//! - **Codec**: message builders and best-effort frame decoding
//! - **Command**: `CommandParser` recognising whitelisted `/verb args` lines
//! - **Network**: `BridgeClient`, a reconnecting WebSocket client with a send queue
//! - **State**: `ConnectionPhase` machine and reconnect `Backoff`
//! - **Session**: `SessionDriver` merging host events with the sampling clock
//! - **Host**: capability traits the embedding host implements
//! - **Error**: `BridgeError`, a typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod command;
pub mod error;
pub mod host;
pub mod message;
pub mod network;
pub mod session;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::{CommandParser, DEFAULT_COMMANDS, ParsedCommand};
pub use error::BridgeError;
pub use host::{Diagnostics, Host, HostEvent, TracingDiagnostics};
pub use message::{
    BlockPos, InboundMessage, OutboundMessage, PROTOCOL_VERSION, PlayerState, Position, Rotation,
};
pub use network::{BridgeClient, ClientConfig, DEFAULT_URL, MAX_FRAME_SIZE, Outbound};
pub use session::{SamplingClock, SessionConfig, SessionDriver, SessionEnd};
pub use state::{Backoff, BackoffPolicy, ConnectionPhase};
