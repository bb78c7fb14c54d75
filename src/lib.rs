//! multichat - a group chat between one user and several AI bots
//!
//! Each message is offered to every bot; bots independently decide whether
//! to answer and after how long, keep their own bounded memory, and reply
//! concurrently. Replies can be produced in-process, by a remote service over
//! a WebSocket session, or by an external runtime that is polled for results.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, errors, logging and notifications
//! - **Agent**: Bot registry, participation policy, history and orchestration
//! - **LLM**: Reply generators (chat-completion API and offline templates)
//! - **Session**: WebSocket client for the remote multi-bot service
//! - **Bridge**: Polling bridge for runtimes that cannot push results
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use multichat::agent::{AgentRegistry, ParticipationPolicy, ResponseOrchestrator};
//! use multichat::llm::TemplatedGenerator;
//! use multichat::{Config, Notification, NotificationSink};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let (sink, mut rx) = NotificationSink::channel();
//!     let orchestrator = ResponseOrchestrator::new(
//!         Arc::new(AgentRegistry::from_config(&config.bots).unwrap()),
//!         Arc::new(TemplatedGenerator::seeded(7)),
//!         ParticipationPolicy::seeded(7),
//!         sink,
//!         config.history.window,
//!     );
//!
//!     orchestrator.submit("What should we cook tonight?");
//!     orchestrator.wait_idle().await;
//!     orchestrator.shutdown().await;
//!
//!     while let Ok(Notification::Reply { message, .. }) = rx.try_recv() {
//!         println!("{}: {}", message.sender_name, message.content);
//!     }
//! }
//! ```

pub mod agent;
pub mod bridge;
pub mod cli;
pub mod core;
pub mod llm;
pub mod session;

// Re-export commonly used items
pub use agent::ResponseOrchestrator;
pub use bridge::PollingBridge;
pub use cli::Repl;
pub use core::{Config, MultichatError, Notification, NotificationSink, Result};
pub use session::SessionClient;
