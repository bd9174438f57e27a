//! Quill Agent Core Library
//!
//! Tool-execution engine and conversation loop for an LLM-driven coding
//! agent: a parallelization classifier, a bounded-concurrency batch
//! executor, session metrics, and the turn driver that ties them to an
//! LLM client and a tool dispatcher.

pub mod agent;
pub mod config;
pub mod cost;
pub mod error;
pub mod events;
pub mod exec;
pub mod llm;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use agent::{LoopState, TerminationReason, TurnDriver, TurnOutcome};
pub use config::ExecutionConfig;
pub use cost::{CostTracker, SessionCostTracker, SessionTotals};
pub use error::{QuillError, QuillResult};
pub use events::{AgentEvent, EventBus, SharedEventBus};
pub use exec::{
    classify, BatchExecutionResult, BatchExecutor, ClassifiedBatch, ClassifierConfig,
    ExecutionMetrics, LaneRegistry, MetricsCollector,
};
pub use llm::{LlmClient, LlmMessage, LlmResponse, LlmStream, MessageRole, StreamChunk};
pub use tools::{
    SharedToolDispatcher, Tool, ToolCall, ToolDispatcher, ToolRegistry, ToolResult, ToolSchema,
};
pub use types::*;
