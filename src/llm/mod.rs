//! LLM module - reply generation backends
//!
//! Provides the generator abstraction with a chat-completion client and an
//! offline template generator.

pub mod completion;
pub mod templated;
pub mod traits;

pub use completion::ChatCompletionClient;
pub use templated::TemplatedGenerator;
pub use traits::ResponseGenerator;
