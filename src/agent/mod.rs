//! Agent module - bots, their memory and reply scheduling
//!
//! Contains the registry of configured bots, the participation policy, the
//! bounded conversation history and the orchestrator that ties them together.

pub mod history;
pub mod orchestrator;
pub mod policy;
pub mod registry;

pub use history::ConversationHistory;
pub use orchestrator::{Dispatch, ResponseOrchestrator};
pub use policy::{Decision, ParticipationPolicy};
pub use registry::{Agent, AgentBuilder, AgentRegistry, DelayRange};
