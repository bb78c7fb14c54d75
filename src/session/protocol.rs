//! Session wire protocol
//!
//! JSON frames exchanged with the remote multi-bot service, the session
//! state machine, and decoding of inbound frames into notifications.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::types::{seconds_to_millis, SYSTEM_COLOR, SYSTEM_SENDER, USER_COLOR};
use crate::core::{ChatMessage, MultichatError, Notification, Result};

/// Color used for remote bots that do not announce one
pub const DEFAULT_BOT_COLOR: &str = "#4A90E2";

/// Connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Frame received from the service
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    SessionInfo { session_id: String },
    History { messages: Vec<WireMessage> },
    UserMessage(WireMessage),
    BotMessage(WireMessage),
    System { content: String, timestamp: f64 },
    Error { content: String },
}

/// A chat message as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub content: String,
    /// Seconds since the epoch, possibly fractional
    pub timestamp: f64,
    pub sender: WireSender,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSender {
    pub name: String,
    pub is_bot: bool,
    #[serde(default)]
    pub color: Option<String>,
}

/// Frame sent to the service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame<'a> {
    Message { content: &'a str, user_name: &'a str },
}

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        let color = match (wire.sender.color, wire.sender.is_bot) {
            (Some(color), _) => color,
            (None, true) => DEFAULT_BOT_COLOR.to_string(),
            (None, false) => USER_COLOR.to_string(),
        };

        ChatMessage::at(
            wire.content,
            wire.sender.name,
            !wire.sender.is_bot,
            color,
            seconds_to_millis(wire.timestamp),
        )
    }
}

impl From<InboundFrame> for Notification {
    fn from(frame: InboundFrame) -> Self {
        match frame {
            InboundFrame::SessionInfo { session_id } => Notification::Connected { session_id },
            InboundFrame::History { messages } => {
                Notification::History(messages.into_iter().map(ChatMessage::from).collect())
            }
            InboundFrame::UserMessage(wire) | InboundFrame::BotMessage(wire) => {
                Notification::Message(wire.into())
            }
            InboundFrame::System { content, timestamp } => Notification::Message(ChatMessage::at(
                content,
                SYSTEM_SENDER,
                false,
                SYSTEM_COLOR,
                seconds_to_millis(timestamp),
            )),
            InboundFrame::Error { content } => Notification::Error(content),
        }
    }
}

/// Decode one text frame into the notification it produces
pub fn decode_frame(text: &str) -> Result<Notification> {
    let frame: InboundFrame = serde_json::from_str(text)
        .map_err(|e| MultichatError::decode(format!("{}: {}", e, truncate(text, 200))))?;
    Ok(frame.into())
}

/// Encode an outbound chat message
pub fn encode_message(content: &str, user_name: &str) -> Result<String> {
    Ok(serde_json::to_string(&OutboundFrame::Message {
        content,
        user_name,
    })?)
}

/// Endpoint URL carrying the session's identity parameters
pub fn connect_url(endpoint: &str, user_id: &str, user_name: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| MultichatError::config(format!("Invalid session URL '{}': {}", endpoint, e)))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(MultichatError::config(format!(
                "Session URL must use ws or wss, got '{}'",
                other
            )))
        }
    }

    url.query_pairs_mut()
        .append_pair("user_id", user_id)
        .append_pair("user_name", user_name);
    Ok(url)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_session_info() {
        let n = decode_frame(r#"{"type":"session_info","session_id":"abc123"}"#).unwrap();
        assert_eq!(
            n,
            Notification::Connected {
                session_id: "abc123".into()
            }
        );
    }

    #[test]
    fn test_decode_history() {
        let n = decode_frame(
            r#"{"type":"history","messages":[{"content":"hi","timestamp":1000.0,"sender":{"name":"A","is_bot":false}}]}"#,
        )
        .unwrap();

        let Notification::History(messages) = n else {
            panic!("expected history, got {:?}", n);
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[0].sender_name, "A");
        assert!(messages[0].is_user);
        assert_eq!(messages[0].timestamp_ms, 1_000_000);
    }

    #[test]
    fn test_decode_bot_message() {
        let n = decode_frame(
            r##"{"type":"bot_message","content":"yo","timestamp":1700000000.25,"sender":{"name":"Ale","is_bot":true,"color":"#F39C12"}}"##,
        )
        .unwrap();

        let Notification::Message(message) = n else {
            panic!("expected message");
        };
        assert!(!message.is_user);
        assert_eq!(message.color, "#F39C12");
        assert_eq!(message.timestamp_ms, 1_700_000_000_250);
    }

    #[test]
    fn test_decode_system_and_error() {
        let n = decode_frame(r#"{"type":"system","content":"Ale joined","timestamp":5.5}"#).unwrap();
        let Notification::Message(message) = n else {
            panic!("expected message");
        };
        assert_eq!(message.sender_name, "system");
        assert_eq!(message.timestamp_ms, 5500);

        let n = decode_frame(r#"{"type":"error","content":"rate limited"}"#).unwrap();
        assert_eq!(n, Notification::Error("rate limited".into()));
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        for bad in [
            "not json",
            r#"{"type":"mystery"}"#,
            r#"{"type":"session_info"}"#,
            r#"{"content":"no type"}"#,
            r#"{"type":"user_message","content":"x","timestamp":"soon","sender":{"name":"a","is_bot":false}}"#,
        ] {
            assert!(
                matches!(decode_frame(bad), Err(MultichatError::ProtocolDecode(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_encode_message() {
        let json = encode_message("hello", "me").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "message", "content": "hello", "user_name": "me"})
        );
    }

    #[test]
    fn test_connect_url() {
        let url = connect_url("ws://localhost:8000/ws", "u-1", "Sam Lee").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8000/ws?user_id=u-1&user_name=Sam+Lee"
        );
        assert!(connect_url("http://localhost/ws", "u", "n").is_err());
        assert!(connect_url("not a url", "u", "n").is_err());
    }
}
