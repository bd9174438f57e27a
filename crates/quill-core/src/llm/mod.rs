//! LLM message types and the client seam
//!
//! Concrete provider transports live outside this crate; the engine only
//! depends on the [`client::LlmClient`] trait.

pub mod client;
pub mod messages;

pub use client::{LlmClient, LlmStream, StreamChunk};
pub use messages::{LlmMessage, LlmResponse, MessageRole};
