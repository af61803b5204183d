//! # agent-workflow
//!
//! Wraps one agent run in a version-control session: cut a fresh branch, run
//! the agent, ask a human, then commit, push and open a pull request (or
//! leave the branch for inspection).
//!
//! ```text
//! BranchCreated ─▶ AgentRunning ─┬─▶ AwaitingApproval ─┬─▶ Finalized
//!                                │                     └─▶ Discarded
//!                                └─▶ Aborted (agent failed, nothing committed)
//! ```

pub mod approval;
pub mod controller;
pub mod error;
pub mod git;
pub mod session;
pub mod vcs;

pub use approval::{ApprovalGate, ApprovalRequest, Decision, StaticGate};
pub use controller::{Step, StepOutcome, StepStatus, WorkflowConfig, WorkflowController, WorkflowReport};
pub use error::{Result, VcsError, VcsResult, WorkflowError};
pub use git::GitCli;
pub use session::{Approval, WorkflowSession, WorkflowState};
pub use vcs::{PullRequest, StatusEntry, VersionControl};
