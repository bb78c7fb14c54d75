//! Session module - persistent connection to a remote multi-bot service
//!
//! The protocol submodule owns the wire format and state definitions; the
//! client submodule drives a WebSocket through them.

pub mod client;
pub mod protocol;

pub use client::SessionClient;
pub use protocol::{decode_frame, encode_message, InboundFrame, SessionState};
