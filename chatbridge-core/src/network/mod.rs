pub mod client;
pub mod ws;

pub use client::{BridgeClient, ClientConfig, DEFAULT_URL, MAX_FRAME_SIZE, Outbound};
