//! # chatbridge-client: console front end for the chat command bridge
//!
//! Reads outgoing chat lines from stdin, forwards whitelisted `/verb`
//! commands and periodic player state to the control process over a
//! reconnecting WebSocket, and prints everything else back as normal
//! chat.

pub mod config;
pub mod console;
