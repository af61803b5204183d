//! Version-control collaborator contract.
//!
//! Every operation is an independent step whose success or failure the
//! controller observes and reports on its own; nothing here is transactional.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VcsResult;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Pull request to open for a pushed branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
}

/// Operations the workflow needs from version control
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Whether a local branch with this name exists
    async fn branch_exists(&self, branch: &str) -> VcsResult<bool>;

    /// Create a branch from the current one and check it out
    async fn create_branch(&self, branch: &str) -> VcsResult<()>;

    /// Changed and untracked files in the working tree
    async fn status(&self) -> VcsResult<Vec<StatusEntry>>;

    /// Stage every change in the working tree
    async fn stage_all(&self) -> VcsResult<()>;

    /// Commit what is staged. `Ok(false)` when nothing was staged.
    async fn commit(&self, message: &str) -> VcsResult<bool>;

    /// Push a branch to the configured remote
    async fn push(&self, branch: &str) -> VcsResult<()>;

    /// Open a pull request and return its URL
    async fn create_pull_request(&self, request: &PullRequest) -> VcsResult<String>;
}
