//! Tool registry and the dispatch seam
//!
//! The executor does not know about concrete tools; it sees a
//! [`ToolDispatcher`]. [`ToolRegistry`] is the standard implementation
//! backed by registered [`Tool`] instances, but external protocol bridges
//! can implement the trait directly.

use crate::tools::base::Tool;
use crate::tools::types::{ToolCall, ToolResult, ToolSchema};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Dispatch seam between the execution engine and concrete tools.
///
/// `dispatch` must always produce a [`ToolResult`] — failures are encoded in
/// the result, never raised — so a single misbehaving tool cannot abort its
/// batch.
///
/// Timeout contract: the executor races `dispatch` against a deadline and
/// drops the future when the deadline fires. Dispatchers that own OS
/// resources (e.g. spawned subprocesses) must tie those resources to the
/// future's lifetime so that dropping it releases them.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Execute a single tool call
    async fn dispatch(&self, call: &ToolCall) -> ToolResult;

    /// Schemas of every dispatchable tool, for the LLM request
    fn schemas(&self) -> Vec<ToolSchema>;

    /// Whether the named tool is read-only; `None` if unknown here
    fn is_read_only(&self, tool_name: &str) -> Option<bool>;

    /// Per-tool timeout override; `None` applies the executor default
    fn timeout_for(&self, tool_name: &str) -> Option<Duration> {
        let _ = tool_name;
        None
    }
}

/// Thread-safe shared dispatcher handle
pub type SharedToolDispatcher = Arc<dyn ToolDispatcher>;

/// Registry of tools, dispatching by name
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Register multiple tools
    pub fn register_all(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        match self.tools.get(&call.name) {
            Some(tool) => tool.execute_with_timing(call).await,
            None => ToolResult::error(
                &call.id,
                &call.name,
                &format!("Tool '{}' not found", call.name),
            ),
        }
    }

    fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|tool| tool.schema()).collect()
    }

    fn is_read_only(&self, tool_name: &str) -> Option<bool> {
        self.tools.get(tool_name).map(|tool| tool.is_read_only())
    }

    fn timeout_for(&self, tool_name: &str) -> Option<Duration> {
        self.tools
            .get(tool_name)
            .and_then(|tool| tool.max_execution_duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::base::ToolError;
    use std::collections::HashMap;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new("echo", "Echoes its input", vec![])
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
            let text = call.get_string("text").unwrap_or_default();
            Ok(ToolResult::success(&call.id, "echo", &text))
        }

        fn is_read_only(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_dispatch_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let mut args = HashMap::new();
        args.insert("text".to_string(), serde_json::json!("hi"));
        let call = ToolCall::new("c1", "echo", args, 0);

        let result = registry.dispatch(&call).await;
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("hi"));
        assert_eq!(registry.is_read_only("echo"), Some(true));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_error_result() {
        let registry = ToolRegistry::new();
        let call = ToolCall::new("c1", "nonexistent", HashMap::new(), 0);

        let result = registry.dispatch(&call).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not found"));
        assert_eq!(result.call_id, "c1");
    }
}
