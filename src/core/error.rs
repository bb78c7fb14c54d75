//! Custom error types for multichat
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

use crate::session::SessionState;

/// Main error type for multichat operations
#[derive(Error, Debug)]
pub enum MultichatError {
    /// Connection open/send/close failures on the session transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected payload from the remote service
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// A bot's generation call failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// The external runtime's pending-result queue could not be drained
    #[error("Bridge drain error: {0}")]
    BridgeDrain(String),

    /// Chat traffic attempted outside the ready state
    #[error("Session not connected (state: {0})")]
    NotConnected(SessionState),

    /// Transport is open but the service has not assigned a session id yet
    #[error("Session not ready: no session_info received yet")]
    NotReady,

    /// Connect called while a connection is already open or opening
    #[error("Session already connected")]
    AlreadyConnected,

    /// External worker used before initialization
    #[error("Worker not initialized")]
    NotInitialized,

    /// Unknown bot id
    #[error("Agent '{0}' not found")]
    AgentNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience Result type for multichat operations
pub type Result<T> = std::result::Result<T, MultichatError>;

impl MultichatError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::ProtocolDecode(msg.into())
    }

    /// Create a generation error
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a bridge drain error
    pub fn drain(msg: impl Into<String>) -> Self {
        Self::BridgeDrain(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for MultichatError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(error.to_string())
    }
}
