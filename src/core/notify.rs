//! Notification channel
//!
//! Every externally visible outcome (bot replies, bot failures, session
//! events, bridge health) flows through one typed channel so the presenter
//! has a single integration point.

use tokio::sync::mpsc;

use crate::core::types::{AgentId, ChatMessage};

/// An event surfaced to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A bot produced a reply
    Reply {
        agent_id: AgentId,
        message: ChatMessage,
    },
    /// A bot's generation call failed
    AgentError {
        agent_id: AgentId,
        agent_name: String,
        error: String,
    },
    /// The remote service assigned a session id
    Connected { session_id: String },
    /// History replay, oldest first
    History(Vec<ChatMessage>),
    /// A live chat message from the remote service
    Message(ChatMessage),
    /// A transport or server-reported error
    Error(String),
    /// The session transport is gone
    Disconnected,
    /// The polling bridge keeps failing to drain results
    BridgeDegraded { consecutive_failures: u32 },
}

/// Cloneable, thread-safe sending half of the notification channel
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSink {
    /// Create a sink and its single consumer
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a notification; a dropped receiver is not an error
    pub fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver dropped; discarding event");
        }
    }

    /// Whether the consumer is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
