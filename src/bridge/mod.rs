//! Bridge module - results from an external, poll-only runtime
//!
//! `PollingBridge` drains any [`ResultSource`]; `QueuedWorker` is an
//! in-process runtime exposing that interface.

pub mod polling;
pub mod worker;

pub use polling::{PendingResult, PollingBridge, ResultSource};
pub use worker::{BotInfo, QueuedWorker};
