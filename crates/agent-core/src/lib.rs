//! # agent-core
//!
//! Tool-dispatch agent loop with a provider-agnostic policy and a fixed
//! tool registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          AgentLoop                           │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ PolicyClient │   │ ToolInvoker  │──▶│   ToolRegistry   │  │
//! │  │ (LlmPolicy)  │   └──────────────┘   └──────────────────┘  │
//! │  └──────┬───────┘                                            │
//! │         ▼                                                    │
//! │  ┌──────────────┐                                            │
//! │  │ LlmProvider  │  (Strategy: Ollama, ...)                   │
//! │  └──────────────┘                                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop sees only three kinds of policy output: a tool call, a final
//! answer, or something unparsable. Tool failures and unparsable output are
//! fed back as observations; only a failing policy or an exhausted step
//! budget ends a run early.

pub mod error;
pub mod invoker;
pub mod message;
pub mod policy;
pub mod provider;
pub mod reasoning;
pub mod tool;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{AgentError, Result};
pub use invoker::ToolInvoker;
pub use message::{Conversation, Message, Role};
pub use policy::{LlmPolicy, PolicyClient, PolicyConfig, PolicyDecision, PolicyRequest};
pub use provider::{GenerationOptions, LlmProvider};
pub use reasoning::{AgentBuilder, AgentConfig, AgentLoop, AgentOutcome};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
