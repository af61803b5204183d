//! Tool Invoker
//!
//! Executes one tool call against the registry and always produces an
//! observation. Unknown tools, schema violations, handler errors and handler
//! panics all come back as failed `ToolResult`s; nothing propagates to the
//! agent loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::tool::{ToolCall, ToolRegistry, ToolResult, ToolSchema};

/// Total function from tool call to observation
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Catalog handed to the policy
    pub fn catalog(&self) -> Vec<ToolSchema> {
        self.registry.describe()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a tool call. Never fails; the returned output is never empty.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let result = self.dispatch(call).await.with_id(call.id.clone());
        if result.output.is_empty() {
            return ToolResult {
                output: format!("{} returned no output", call.name),
                ..result
            };
        }
        result
    }

    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let tool = match self.registry.resolve(&call.name) {
            Ok(tool) => tool,
            Err(e) => {
                warn!(tool = %call.name, "policy requested unknown tool");
                return ToolResult::failure(
                    &call.name,
                    format!("{e} (available: {})", self.registry.names().join(", ")),
                );
            }
        };

        if let Err(e) = tool.validate(call) {
            debug!(tool = %call.name, error = %e, "tool arguments rejected");
            return ToolResult::failure(&call.name, e.to_string());
        }

        debug!(tool = %call.name, "executing tool");
        match AssertUnwindSafe(tool.execute(call)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "tool returned error");
                ToolResult::failure(&call.name, format!("{} failed: {e}", call.name))
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                warn!(tool = %call.name, %detail, "tool panicked");
                ToolResult::failure(&call.name, format!("{} crashed: {detail}", call.name))
            }
        }
    }
}
