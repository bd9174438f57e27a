//! Base trait and error type for tools

use crate::error::QuillError;
use crate::tools::types::{ToolCall, ToolResult, ToolSchema};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Error type for tool operations
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid arguments provided to the tool
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Tool not found
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Tool execution cancelled
    #[error("Tool execution cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<ToolError> for QuillError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => QuillError::tool(name, "Tool not found".to_string()),
            other => QuillError::tool("unknown".to_string(), other.to_string()),
        }
    }
}

/// Base trait for all tools.
///
/// Tools are capabilities the agent can use against the environment. The
/// engine only cares about the name, schema, read-only flag, and the
/// execute entry point; everything else has sensible defaults.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, lowercase with underscores (e.g. "read_file")
    fn name(&self) -> &str;

    /// Description included in the system prompt
    fn description(&self) -> &str;

    /// JSON schema for input parameters
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError>;

    /// Validate the tool call arguments before execution
    fn validate(&self, call: &ToolCall) -> Result<(), ToolError> {
        let _ = call;
        Ok(())
    }

    /// Whether this tool only reads data (no side effects)
    fn is_read_only(&self) -> bool {
        false
    }

    /// Per-tool execution timeout; `None` means the executor default applies
    fn max_execution_duration(&self) -> Option<Duration> {
        None
    }

    /// Execute the tool with timing and error capture.
    ///
    /// Never returns an error: validation and execution failures are folded
    /// into a failed [`ToolResult`] so a single call cannot abort its batch.
    async fn execute_with_timing(&self, call: &ToolCall) -> ToolResult {
        let start_time = Instant::now();

        if let Err(err) = self.validate(call) {
            return ToolResult::error(&call.id, self.name(), &err.to_string())
                .with_execution_time(start_time.elapsed().as_millis() as u64);
        }

        match self.execute(call).await {
            Ok(mut result) => {
                result.execution_time_ms = Some(start_time.elapsed().as_millis() as u64);
                result
            }
            Err(err) => ToolResult::error(&call.id, self.name(), &err.to_string())
                .with_execution_time(start_time.elapsed().as_millis() as u64),
        }
    }
}
