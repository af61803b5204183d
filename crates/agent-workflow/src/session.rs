//! Workflow Session
//!
//! One end-to-end run from a fresh branch to finalize or discard. A session
//! accepts exactly one approval decision and is never retried.

use std::fmt;

use agent_core::AgentOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::approval::Decision;
use crate::error::{Result, WorkflowError};

/// Where a session is in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    BranchCreated,
    AgentRunning,
    AwaitingApproval,
    Finalized,
    Discarded,
    /// The agent run failed; nothing was committed
    Aborted,
}

impl WorkflowState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Discarded | Self::Aborted)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Approval status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    Pending,
    Approved,
    Rejected,
}

/// A single workflow session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub id: Uuid,
    pub branch: String,
    pub instruction: String,
    pub state: WorkflowState,
    pub outcome: Option<AgentOutcome>,
    pub approval: Approval,
    pub created_at: DateTime<Utc>,
}

impl WorkflowSession {
    /// Session on a branch that has just been checked out
    pub fn new(branch: impl Into<String>, instruction: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            branch: branch.into(),
            instruction: instruction.into(),
            state: WorkflowState::BranchCreated,
            outcome: None,
            approval: Approval::Pending,
            created_at,
        }
    }

    pub(crate) fn transition(&mut self, next: WorkflowState) {
        debug!(session = %self.id, from = %self.state, to = %next, "session transition");
        self.state = next;
    }

    /// Record the one approval decision this session accepts
    pub fn record_decision(&mut self, decision: Decision) -> Result<()> {
        if self.approval != Approval::Pending {
            return Err(WorkflowError::AlreadyDecided(self.id.to_string()));
        }
        self.approval = match decision {
            Decision::Approve => Approval::Approved,
            Decision::Reject => Approval::Rejected,
        };
        Ok(())
    }
}
