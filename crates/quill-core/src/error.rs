//! Core error types for Quill

use thiserror::Error;

/// Result type alias for Quill operations
pub type QuillResult<T> = Result<T, QuillError>;

/// Main error type for the Quill agent core
#[derive(Error, Debug, Clone)]
pub enum QuillError {
    /// LLM communication errors
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
    },

    /// Tool execution errors
    #[error("Tool error: {tool_name}: {message}")]
    Tool { tool_name: String, message: String },

    /// Loop driver errors
    #[error("Agent error: {message}")]
    Agent { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Operation was cancelled
    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    /// Catch-all for other errors
    #[error("{message}")]
    Other { message: String },
}

impl QuillError {
    /// Create an LLM error
    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
            provider: None,
        }
    }

    /// Create an LLM error attributed to a provider
    pub fn llm_with_provider<S: Into<String>>(message: S, provider: S) -> Self {
        Self::Llm {
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    /// Create a tool error
    pub fn tool<S: Into<String>>(tool_name: S, message: S) -> Self {
        Self::Tool {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create an agent error
    pub fn agent<S: Into<String>>(message: S) -> Self {
        Self::Agent {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Message suitable for surfacing to the user in a conversation entry
    pub fn user_message(&self) -> String {
        match self {
            Self::Llm { message, provider } => match provider {
                Some(p) => format!("The model request failed ({}): {}", p, message),
                None => format!("The model request failed: {}", message),
            },
            Self::Tool { tool_name, message } => {
                format!("Tool '{}' failed: {}", tool_name, message)
            }
            Self::Cancelled { message } => format!("Operation cancelled: {}", message),
            other => other.to_string(),
        }
    }
}
