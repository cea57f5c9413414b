//! Shared library for the wellness chat functions.
//!
//! This crate provides the chat relay and its collaborators, plus the common
//! configuration, error and HTTP plumbing used by every function.

pub mod completion;
pub mod config;
pub mod crisis;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod rate_limit;
pub mod relay;
pub mod secrets;
pub mod store;
pub mod wellness;

#[cfg(test)]
pub(crate) mod canned_http;

pub use completion::{CompletionProvider, CompletionSettings, OpenAiProvider, ProviderError};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{ChatRequest, ChatResponse, ChatTurn, NewChatTurn, Role};
pub use rate_limit::{FixedWindowLimiter, RateLimitConfig, RateLimiter};
pub use relay::{ChatRelay, RelayError};
pub use store::{ConversationStore, MemoryStore};
