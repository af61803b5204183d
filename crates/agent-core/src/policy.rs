//! Policy
//!
//! The policy decides the next action from the instruction, the tool catalog
//! and the conversation so far. The agent loop only sees the three-way
//! [`PolicyDecision`]; how a decision is produced is up to the implementor.
//!
//! [`LlmPolicy`] is the model-backed implementation. It asks the model to
//! answer either with a fenced tool block:
//!
//! ````text
//! ```tool
//! {"tool": "read_file", "arguments": {"path": "lib/main.dart"}}
//! ```
//! ````
//!
//! or with plain prose, which is taken as the final answer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolSchema};

const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";

/// Everything the policy is shown for one decision
#[derive(Clone, Copy, Debug)]
pub struct PolicyRequest<'a> {
    pub instruction: &'a str,
    pub tools: &'a [ToolSchema],
    pub history: &'a [Message],
}

/// Classified policy output
#[derive(Clone, Debug, PartialEq)]
pub enum PolicyDecision {
    /// Run a tool and report back
    ToolCall(ToolCall),
    /// Done; the text is the run's output
    Final(String),
    /// Output that fits neither case
    Malformed { raw: String, error: String },
}

/// Decides the next step of an agent run
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// `Err` means the policy itself could not be consulted; it ends the run.
    async fn decide(&self, request: PolicyRequest<'_>) -> Result<PolicyDecision>;
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a careful software engineer working inside a project checkout.

To act on the project, reply with exactly one tool block and nothing else:
```tool
{"tool": "tool_name", "arguments": {"arg1": "value1"}}
```

Each tool result is sent back to you. Work in small steps: look at the
project layout, read the files you need, then write complete new file
contents. When the task is finished, reply in plain text (no tool block)
with a short summary of what you changed."#;

/// Policy configuration
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    /// System prompt preamble; the tool catalog and task are appended
    pub system_prompt: String,

    /// Generation options passed to the provider
    pub generation: GenerationOptions,

    /// Extra attempts for retryable provider errors
    pub max_retries: u32,

    /// Base backoff; attempt `n` waits `n * retry_delay`
    pub retry_delay: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            generation: GenerationOptions::default(),
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Model-backed policy speaking the fenced tool-block protocol
pub struct LlmPolicy {
    provider: Arc<dyn LlmProvider>,
    config: PolicyConfig,
}

impl LlmPolicy {
    pub fn new(provider: Arc<dyn LlmProvider>, config: PolicyConfig) -> Self {
        Self { provider, config }
    }

    pub fn with_defaults(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, PolicyConfig::default())
    }

    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    fn build_system_prompt(&self, request: &PolicyRequest<'_>) -> String {
        let mut prompt = self.config.system_prompt.clone();
        if !request.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&render_catalog(request.tools));
        }
        prompt.push_str("\n## Task\n\n");
        prompt.push_str(request.instruction);
        prompt
    }

    fn build_messages(&self, request: &PolicyRequest<'_>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        messages.push(Message::system(self.build_system_prompt(request)));
        messages.extend_from_slice(request.history);
        messages
    }
}

#[async_trait]
impl PolicyClient for LlmPolicy {
    async fn decide(&self, request: PolicyRequest<'_>) -> Result<PolicyDecision> {
        let messages = self.build_messages(&request);
        let mut attempt = 0;

        let completion = loop {
            match self
                .provider
                .complete(&messages, &self.config.generation)
                .await
            {
                Ok(completion) => break completion,
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        error = %e,
                        "retryable provider error"
                    );
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(usage) = completion.usage {
            debug!(
                model = %completion.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion received"
            );
        }

        Ok(parse_response(&completion.content))
    }
}

/// Classify raw model text into a decision
pub fn parse_response(content: &str) -> PolicyDecision {
    let trimmed = content.trim();

    if let Some(start_idx) = trimmed.find(TOOL_FENCE) {
        let after_marker = &trimmed[start_idx + TOOL_FENCE.len()..];
        let Some(end_idx) = after_marker.find(FENCE_END) else {
            return malformed(content, "tool block is not closed with ```");
        };
        return parse_call(content, after_marker[..end_idx].trim());
    }

    if trimmed.starts_with('{') {
        return parse_call(content, trimmed);
    }

    if trimmed.is_empty() {
        return malformed(content, "empty response");
    }

    PolicyDecision::Final(trimmed.to_string())
}

fn parse_call(raw: &str, json: &str) -> PolicyDecision {
    match serde_json::from_str::<ToolCall>(json) {
        Ok(mut call) => {
            if call.id.is_none() {
                call.id = Some(uuid::Uuid::new_v4().to_string());
            }
            PolicyDecision::ToolCall(call)
        }
        Err(e) => malformed(raw, AgentError::Parse(format!("invalid tool call JSON: {e}")).to_string()),
    }
}

fn malformed(raw: &str, error: impl Into<String>) -> PolicyDecision {
    PolicyDecision::Malformed {
        raw: raw.to_string(),
        error: error.into(),
    }
}

/// Render the catalog as a prompt section
pub fn render_catalog(tools: &[ToolSchema]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");

    for schema in tools {
        prompt.push_str(&format!("### {}\n{}\n", schema.name, schema.description));

        if !schema.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let required = if param.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}: {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::message::Role;
    use crate::provider::{Completion, ModelInfo};
    use crate::tool::ParameterSchema;

    #[test]
    fn test_parse_tool_call() {
        let content = r#"Let me check that for you.
```tool
{"tool": "read_file", "arguments": {"path": "lib/main.dart"}}
```"#;

        match parse_response(content) {
            PolicyDecision::ToolCall(call) => {
                assert_eq!(call.name, "read_file");
                assert_eq!(call.str_arg("path"), Some("lib/main.dart"));
                assert!(call.id.is_some());
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn bare_json_object_is_a_tool_call() {
        let content = r#"  {"name": "list_project_files", "parameters": {"directory": "lib"}} "#;
        assert!(matches!(
            parse_response(content),
            PolicyDecision::ToolCall(call) if call.name == "list_project_files"
        ));
    }

    #[test]
    fn prose_is_final_answer() {
        assert_eq!(
            parse_response("  done \n"),
            PolicyDecision::Final("done".into())
        );
    }

    #[test]
    fn broken_replies_are_malformed() {
        for content in [
            "```tool\n{\"tool\": \"read_file\", \"arguments\": \n```",
            "```tool\n{\"tool\": \"read_file\"}",
            "{not json at all",
            "   ",
        ] {
            assert!(
                matches!(parse_response(content), PolicyDecision::Malformed { .. }),
                "{content:?} should be malformed"
            );
        }
    }

    #[test]
    fn malformed_keeps_raw_text_and_reason() {
        let PolicyDecision::Malformed { raw, error } = parse_response("") else {
            panic!("expected malformed");
        };
        assert_eq!(raw, "");
        assert_eq!(error, "empty response");
    }

    #[test]
    fn catalog_lists_parameters() {
        let tools = vec![ToolSchema {
            name: "write_file".into(),
            description: "Write a file".into(),
            parameters: vec![
                ParameterSchema::string("path", "Target path"),
                ParameterSchema::string("content", "File content"),
            ],
            has_side_effects: true,
        }];

        let section = render_catalog(&tools);
        assert!(section.contains("### write_file"));
        assert!(section.contains("- `path` (string) (required): Target path"));
    }

    struct FlakyProvider {
        failures: Mutex<u32>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AgentError::ProviderUnavailable("connection refused".into()));
            }
            Ok(Completion::text(&options.model, "all done"))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            failures: Mutex::new(failures),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn fast_config(max_retries: u32) -> PolicyConfig {
        PolicyConfig {
            max_retries,
            retry_delay: Duration::from_millis(1),
            ..PolicyConfig::default()
        }
    }

    #[tokio::test]
    async fn retries_transient_provider_errors() {
        let provider = flaky(2);
        let policy = LlmPolicy::new(provider.clone(), fast_config(2));
        let history = vec![Message::user("add a history screen")];

        let decision = policy
            .decide(PolicyRequest {
                instruction: "add a history screen",
                tools: &[],
                history: &history,
            })
            .await
            .unwrap();

        assert_eq!(decision, PolicyDecision::Final("all done".into()));
        assert_eq!(provider.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let policy = LlmPolicy::new(flaky(5), fast_config(1));
        let result = policy
            .decide(PolicyRequest {
                instruction: "x",
                tools: &[],
                history: &[],
            })
            .await;

        assert!(matches!(result, Err(AgentError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn system_turn_carries_catalog_and_task() {
        let provider = flaky(0);
        let policy = LlmPolicy::new(provider.clone(), fast_config(0));
        let tools = vec![ToolSchema {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: vec![ParameterSchema::string("path", "Path")],
            has_side_effects: false,
        }];
        let history = vec![Message::user("fix the counter")];

        policy
            .decide(PolicyRequest {
                instruction: "fix the counter",
                tools: &tools,
                history: &history,
            })
            .await
            .unwrap();

        let seen = provider.seen.lock().unwrap();
        let sent = &seen[0];
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[0].content.contains("### read_file"));
        assert!(sent[0].content.ends_with("fix the counter"));
        assert_eq!(sent[1].content, "fix the counter");
    }
}
