//! Tool types, the `Tool` trait, and the dispatch seam

pub mod base;
pub mod names;
pub mod registry;
pub mod types;

pub use base::{Tool, ToolError};
pub use registry::{SharedToolDispatcher, ToolDispatcher, ToolRegistry};
pub use types::{ToolCall, ToolParameter, ToolResult, ToolSchema};
