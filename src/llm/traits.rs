//! Response generator trait
//!
//! Abstracts the capability that turns a bot's memory plus a new user
//! message into a reply (remote chat-completion API, templates, an external
//! runtime...).

use async_trait::async_trait;

use crate::agent::Agent;
use crate::core::{Result, Turn};

/// Produces one bot's reply
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply.
    ///
    /// `history` is the bot's memory before this message (pinned system turn
    /// first); `message` is the new user message, not yet part of `history`.
    async fn generate(&self, agent: &Agent, history: &[Turn], message: &str) -> Result<String>;

    /// Get the generator name
    fn name(&self) -> &str;
}
