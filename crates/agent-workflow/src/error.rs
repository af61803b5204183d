//! Error Types

use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Result type alias for version-control commands
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Failure of a single version-control command
#[derive(Error, Debug)]
pub enum VcsError {
    /// The command could not be started at all
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully
    #[error("{command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    /// The command succeeded but printed something we could not use
    #[error("unexpected output from {command}: {detail}")]
    Output { command: String, detail: String },
}

/// Workflow error types
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The session branch could not be created
    #[error("branch creation failed: {0}")]
    BranchCreation(#[source] VcsError),

    /// No approval decision could be obtained
    #[error("approval failed: {0}")]
    Approval(String),

    /// A second decision was offered for a session already decided
    #[error("session {0} already has an approval decision")]
    AlreadyDecided(String),
}
