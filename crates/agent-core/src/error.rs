//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    /// Tool arguments did not match the declared schema
    #[error("invalid arguments for {tool}: {reason}")]
    ToolValidation { tool: String, reason: String },

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Model output could not be classified
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::Io(_))
    }

    pub fn validation(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolValidation {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}
