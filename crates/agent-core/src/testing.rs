//! Test-only policy that replays a fixed script of decisions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::policy::{PolicyClient, PolicyDecision, PolicyRequest};
use crate::tool::ToolCall;

/// Replays decisions in order and records every history it was shown.
///
/// Once the script is exhausted it either repeats a fallback decision or
/// fails with a provider error.
pub struct ScriptedPolicy {
    script: Mutex<VecDeque<PolicyDecision>>,
    fallback: Option<PolicyDecision>,
    failure: String,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedPolicy {
    pub fn new(decisions: impl IntoIterator<Item = PolicyDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().collect()),
            fallback: None,
            failure: "script exhausted".into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Return the same decision forever
    pub fn repeating(decision: PolicyDecision) -> Self {
        Self {
            fallback: Some(decision),
            ..Self::new(Vec::new())
        }
    }

    /// Fail with this message once the script runs out
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.failure = message.into();
        self
    }

    /// Number of decisions requested so far
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// History passed on each call, in call order
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PolicyClient for ScriptedPolicy {
    async fn decide(&self, request: PolicyRequest<'_>) -> Result<PolicyDecision> {
        self.seen.lock().unwrap().push(request.history.to_vec());

        let next = self.script.lock().unwrap().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(decision) => Ok(decision),
            None => Err(AgentError::Provider(self.failure.clone())),
        }
    }
}

/// Build a tool-call decision from string arguments
pub fn tool_call(name: &str, args: &[(&str, &str)]) -> PolicyDecision {
    let call = args
        .iter()
        .fold(ToolCall::new(name), |call, (key, value)| call.arg(*key, *value));
    PolicyDecision::ToolCall(ToolCall {
        id: Some(format!("call-{name}")),
        ..call
    })
}
