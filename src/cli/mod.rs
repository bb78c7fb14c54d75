//! CLI module - command-line interface
//!
//! Contains the chat backends, the REPL and command parsing.

pub mod backend;
pub mod commands;
pub mod repl;

pub use backend::{BackendOptions, ChatBackend, Mode};
pub use repl::Repl;
