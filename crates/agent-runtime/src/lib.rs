//! # agent-runtime
//!
//! Runtime providers for code-agent.
//!
//! ## Providers
//!
//! - **Ollama** (default): Local LLM inference via Ollama
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OllamaProvider;
//!
//! let provider = Arc::new(OllamaProvider::from_env());
//! let policy = LlmPolicy::with_defaults(provider);
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{AgentError, GenerationOptions, LlmProvider, Message, Result, Role};
