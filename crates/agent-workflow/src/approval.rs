//! Human approval gate.

use std::sync::atomic::{AtomicUsize, Ordering};

use agent_core::AgentOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::vcs::StatusEntry;

/// What the operator is shown before deciding
#[derive(Debug, Clone, Copy)]
pub struct ApprovalRequest<'a> {
    pub session_id: Uuid,
    pub branch: &'a str,
    pub instruction: &'a str,
    pub outcome: &'a AgentOutcome,
    pub changed_files: &'a [StatusEntry],
}

/// The operator's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Blocking yes/no checkpoint between the agent run and finalization.
///
/// Asked at most once per session.
pub trait ApprovalGate: Send + Sync {
    fn decide(&self, request: &ApprovalRequest<'_>) -> Result<Decision>;
}

/// Gate that always gives the same answer
#[derive(Debug)]
pub struct StaticGate {
    decision: Decision,
    asked: AtomicUsize,
}

impl StaticGate {
    pub const fn new(decision: Decision) -> Self {
        Self {
            decision,
            asked: AtomicUsize::new(0),
        }
    }

    pub const fn approve() -> Self {
        Self::new(Decision::Approve)
    }

    pub const fn reject() -> Self {
        Self::new(Decision::Reject)
    }

    /// How many times the gate was consulted
    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl ApprovalGate for StaticGate {
    fn decide(&self, _request: &ApprovalRequest<'_>) -> Result<Decision> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision)
    }
}
