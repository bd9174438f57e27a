//! LLM client seam
//!
//! The conversation loop talks to the model exclusively through the
//! [`LlmClient`] trait. Provider transports (HTTP, retries, rate limiting)
//! are a collaborator concern and live in other crates.

use crate::error::QuillResult;
use crate::llm::messages::{LlmMessage, LlmResponse};
use crate::tools::types::ToolSchema;
use crate::types::LlmUsage;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A chunk of streaming response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental content
    pub content: Option<String>,
    /// Tool calls (accumulated, usually in the final chunks)
    pub tool_calls: Option<Vec<crate::tools::ToolCall>>,
    /// Usage information (usually only in the last chunk)
    pub usage: Option<LlmUsage>,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason (if final)
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    /// Create a content chunk
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: None,
            usage: None,
            is_final: false,
            finish_reason: None,
        }
    }

    /// Create a tool call chunk
    pub fn tool_calls(tool_calls: Vec<crate::tools::ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: Some(tool_calls),
            usage: None,
            is_final: false,
            finish_reason: None,
        }
    }

    /// Create a final chunk with usage information
    pub fn final_chunk(usage: Option<LlmUsage>, finish_reason: Option<String>) -> Self {
        Self {
            content: None,
            tool_calls: None,
            usage,
            is_final: true,
            finish_reason,
        }
    }
}

/// Stream of LLM response chunks
pub type LlmStream = Pin<Box<dyn Stream<Item = QuillResult<StreamChunk>> + Send>>;

/// Client seam for LLM interactions.
///
/// Implementations own transport, retry, and rate-limit policy; the engine
/// never retries a failed `chat` call (a communication failure terminates
/// the round, see the loop driver).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request
    async fn chat(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[ToolSchema]>,
    ) -> QuillResult<LlmResponse>;

    /// Send a streaming chat completion request
    async fn chat_stream(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[ToolSchema]>,
    ) -> QuillResult<LlmStream>;
}

/// Utility functions for working with streams
pub mod stream_utils {
    use super::*;
    use futures::StreamExt;

    /// Collect a stream into a complete response
    pub async fn collect_stream(mut stream: LlmStream) -> QuillResult<LlmResponse> {
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = None;
        let mut finish_reason = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.content {
                content.push_str(&delta);
            }
            if let Some(calls) = chunk.tool_calls {
                tool_calls.extend(calls);
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.is_final {
                finish_reason = chunk.finish_reason;
            }
        }

        let mut response = LlmResponse::with_tool_calls(content, tool_calls);
        response.usage = usage;
        response.finish_reason = finish_reason;
        Ok(response)
    }
}
