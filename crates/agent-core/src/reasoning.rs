//! Agent Loop
//!
//! Query the policy, run the requested tool, feed the observation back,
//! repeat. A run ends in exactly one [`AgentOutcome`]:
//!
//! - the policy gives a final answer → `Completed`
//! - the policy cannot be consulted → `Failed` (no retry here; retrying is
//!   the policy's business)
//! - `max_steps` policy queries pass without a final answer → `Failed`
//!
//! Tool failures and unparsable replies never end a run; they become
//! observations the policy can react to on the next step.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{AgentError, Result};
use crate::invoker::ToolInvoker;
use crate::message::{Conversation, Message};
use crate::policy::{PolicyClient, PolicyDecision, PolicyRequest};
use crate::tool::{Tool, ToolRegistry};

/// Prefix of the observation sent after an unparsable reply
pub const CORRECTIVE_PREFIX: &str = "Your last reply could not be parsed:";

/// Reason reported when the step budget runs out
pub const STEP_LIMIT_EXCEEDED: &str = "step limit exceeded";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum policy queries per run
    pub max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_steps: 25 }
    }
}

/// Terminal value of one agent run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AgentOutcome {
    Completed(String),
    Failed(String),
}

impl AgentOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Output on completion, reason on failure
    pub fn text(&self) -> &str {
        match self {
            Self::Completed(text) | Self::Failed(text) => text,
        }
    }
}

/// The tool-dispatch control loop
pub struct AgentLoop {
    policy: Arc<dyn PolicyClient>,
    invoker: ToolInvoker,
    config: AgentConfig,
}

impl AgentLoop {
    /// Create a new agent loop
    pub const fn new(policy: Arc<dyn PolicyClient>, invoker: ToolInvoker, config: AgentConfig) -> Self {
        Self {
            policy,
            invoker,
            config,
        }
    }

    /// Run on an instruction with a fresh conversation
    pub async fn run(&self, instruction: &str) -> AgentOutcome {
        let mut conversation = Conversation::from_instruction(instruction);
        self.drive(instruction, &mut conversation).await
    }

    /// Run against a caller-owned conversation, which is left holding the
    /// full transcript
    #[instrument(skip_all, fields(max_steps = self.config.max_steps))]
    pub async fn drive(&self, instruction: &str, conversation: &mut Conversation) -> AgentOutcome {
        let catalog = self.invoker.catalog();

        for step in 1..=self.config.max_steps {
            let request = PolicyRequest {
                instruction,
                tools: &catalog,
                history: conversation.messages(),
            };

            let decision = match self.policy.decide(request).await {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(step, error = %e, "policy invocation failed");
                    return AgentOutcome::Failed(format!("policy error: {e}"));
                }
            };

            match decision {
                PolicyDecision::Final(output) => {
                    info!(step, "agent completed");
                    conversation.push(Message::assistant(&output));
                    return AgentOutcome::Completed(output);
                }
                PolicyDecision::ToolCall(call) => {
                    debug!(step, tool = %call.name, "dispatching tool call");
                    conversation.push(Message::assistant(call.to_block()));
                    let result = self.invoker.invoke(&call).await;
                    conversation.push(Message::tool(result.observation(), call.id.clone()));
                }
                PolicyDecision::Malformed { raw, error } => {
                    warn!(step, %error, "unparsable policy reply");
                    if !raw.trim().is_empty() {
                        conversation.push(Message::assistant(raw));
                    }
                    conversation.push(Message::tool(
                        format!(
                            "{CORRECTIVE_PREFIX} {error}. Reply with exactly one ```tool block, \
                             or with plain text if the task is finished."
                        ),
                        None,
                    ));
                }
            }
        }

        warn!(max_steps = self.config.max_steps, "step limit exceeded");
        AgentOutcome::Failed(STEP_LIMIT_EXCEEDED.into())
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        self.invoker.registry()
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for [`AgentLoop`]
pub struct AgentBuilder {
    policy: Option<Arc<dyn PolicyClient>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            policy: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn policy(mut self, policy: Arc<dyn PolicyClient>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub const fn max_steps(mut self, max: usize) -> Self {
        self.config.max_steps = max;
        self
    }

    pub fn build(self) -> Result<AgentLoop> {
        let policy = self
            .policy
            .ok_or_else(|| AgentError::Config("Policy is required".into()))?;
        if self.config.max_steps == 0 {
            return Err(AgentError::Config("max_steps must be > 0".into()));
        }

        let invoker = ToolInvoker::new(Arc::new(self.tools));
        Ok(AgentLoop::new(policy, invoker, self.config))
    }
}
