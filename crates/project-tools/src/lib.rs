//! # project-tools
//!
//! Domain-agnostic tools the agent uses on a project checkout:
//!
//! - `read_file`: file contents, or a `not found` / `read failed` observation
//! - `write_file`: overwrite a file, creating parent directories
//! - `list_project_files`: every file under a directory, sorted
//! - `run_checks`: a configured check command (only when one is configured)
//!
//! Relative paths resolve against the project root.

mod list_files;
mod paths;
mod process;
mod read_file;
mod run_checks;
mod write_file;

use std::path::PathBuf;

use agent_core::ToolRegistry;

pub use list_files::ListProjectFilesTool;
pub use paths::ProjectRoot;
pub use read_file::ReadFileTool;
pub use run_checks::{CheckCommand, RunChecksTool};
pub use write_file::WriteFileTool;

/// Registry with the built-in tools rooted at `root`.
///
/// `run_checks` is added only when a check command is given.
pub fn builtin_registry(root: impl Into<PathBuf>, checks: Option<CheckCommand>) -> ToolRegistry {
    let root = ProjectRoot::new(root);
    let mut tools = ToolRegistry::new();

    tools.register(ReadFileTool::new(root.clone()));
    tools.register(WriteFileTool::new(root.clone()));
    tools.register(ListProjectFilesTool::new(root.clone()));
    if let Some(checks) = checks {
        tools.register(RunChecksTool::new(root, checks));
    }

    tools
}
