//! Execution engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the tool-execution engine and conversation loop.
///
/// All fields have sensible defaults so callers can use struct-update
/// syntax to override only what they need:
///
/// ```rust
/// use quill_core::config::ExecutionConfig;
///
/// let config = ExecutionConfig {
///     max_concurrency: 4,
///     ..Default::default()
/// };
/// assert!(config.parallel_enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Whether tool batches may run in parallel at all
    pub parallel_enabled: bool,
    /// Maximum number of tool calls running concurrently
    pub max_concurrency: usize,
    /// Per-call execution timeout
    #[serde(with = "humantime_serde")]
    pub tool_timeout: Duration,
    /// Maximum number of tool rounds per turn
    pub max_tool_rounds: u32,
    /// Tool names that must always execute sequentially
    pub force_sequential: Vec<String>,
    /// Tool names treated as read-only in addition to the built-in table
    pub additional_read_only: Vec<String>,
    /// Capacity of the broadcast event bus
    pub event_capacity: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            max_concurrency: 8,
            tool_timeout: Duration::from_secs(300),
            max_tool_rounds: 25,
            force_sequential: Vec::new(),
            additional_read_only: Vec::new(),
            event_capacity: 256,
        }
    }
}

impl ExecutionConfig {
    /// Validate configuration values
    pub fn validate(&self) -> crate::error::QuillResult<()> {
        if self.max_concurrency == 0 {
            return Err(crate::error::QuillError::config(
                "max_concurrency must be at least 1",
            ));
        }
        if self.max_tool_rounds == 0 {
            return Err(crate::error::QuillError::config(
                "max_tool_rounds must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExecutionConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.parallel_enabled);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = ExecutionConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_humantime() {
        let config: ExecutionConfig =
            serde_json::from_str(r#"{"tool_timeout": "30s", "max_concurrency": 2}"#).unwrap();
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 2);
        // Unspecified fields fall back to defaults
        assert_eq!(config.max_tool_rounds, 25);
    }
}
