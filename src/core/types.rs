//! Shared types used across multichat modules
//!
//! Contains conversation turns and the presentation-facing chat message.

use serde::{Deserialize, Serialize};

/// Sender name used for messages synthesized by the system
pub const SYSTEM_SENDER: &str = "system";

/// Color used for system and error messages
pub const SYSTEM_COLOR: &str = "#999999";

/// Color used for the local user's own messages
pub const USER_COLOR: &str = "#000000";

/// Stable identifier of a bot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Speaking style of a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temperament {
    /// Lively, uses interjections and emoticons
    Playful,
    /// Logical and detail oriented
    Analytical,
    /// Elegant and lyrical
    Poetic,
    /// Jokes and keeps the mood up
    Humorous,
    /// Gentle, a good listener
    Caring,
}

impl Temperament {
    /// Style guidance used in the bot's system prompt
    pub fn style_hint(&self) -> &'static str {
        match self {
            Temperament::Playful => "light and lively, fond of interjections and emoticons",
            Temperament::Analytical => "clear logic with attention to detail",
            Temperament::Poetic => "graceful and understated, rich in imagery",
            Temperament::Humorous => "relaxed and funny, good at lifting the mood",
            Temperament::Caring => "gentle and considerate, quick to empathize",
        }
    }
}

impl std::fmt::Display for Temperament {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Temperament::Playful => "playful",
            Temperament::Analytical => "analytical",
            Temperament::Poetic => "poetic",
            Temperament::Humorous => "humorous",
            Temperament::Caring => "caring",
        };
        f.write_str(name)
    }
}

/// Role of a turn in a bot's conversation memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a bot's conversation memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Turn {
    /// Create a new user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A message as shown to the user
///
/// Created by the orchestrator, the session client, or the polling bridge and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub sender_name: String,
    pub is_user: bool,
    pub color: String,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl ChatMessage {
    /// Create a message stamped with the current time
    pub fn new(
        content: impl Into<String>,
        sender_name: impl Into<String>,
        is_user: bool,
        color: impl Into<String>,
    ) -> Self {
        Self::at(content, sender_name, is_user, color, now_millis())
    }

    /// Create a message with an explicit timestamp
    pub fn at(
        content: impl Into<String>,
        sender_name: impl Into<String>,
        is_user: bool,
        color: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            content: content.into(),
            sender_name: sender_name.into(),
            is_user,
            color: color.into(),
            timestamp_ms,
        }
    }

    /// Create a bot message stamped with the current time
    pub fn bot(
        sender_name: impl Into<String>,
        color: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(content, sender_name, false, color)
    }

    /// Create a system message stamped with the current time
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(content, SYSTEM_SENDER, false, SYSTEM_COLOR)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert fractional epoch seconds to integer milliseconds
pub fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis(1000.0), 1_000_000);
        assert_eq!(seconds_to_millis(1.2346), 1235);
        assert_eq!(seconds_to_millis(0.0), 0);
    }

    #[test]
    fn test_role_serialization() {
        let turn = Turn::assistant("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hello"}"#);
    }
}
