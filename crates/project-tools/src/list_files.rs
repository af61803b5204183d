//! List Project Files Tool

use agent_core::{ParameterSchema, Result, Tool, ToolCall, ToolResult, ToolSchema};
use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::paths::ProjectRoot;

const NAME: &str = "list_project_files";
const DEFAULT_DIRECTORY: &str = "lib";
pub const NO_FILES: &str = "no files found";

/// Recursively lists files under a directory, one path per line
pub struct ListProjectFilesTool {
    root: ProjectRoot,
}

impl ListProjectFilesTool {
    pub const fn new(root: ProjectRoot) -> Self {
        Self { root }
    }

    fn list(&self, directory: &str) -> Vec<String> {
        let start = self.root.resolve(directory);
        if !start.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| self.root.display(entry.path()))
            .collect()
    }
}

#[async_trait]
impl Tool for ListProjectFilesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "List every file under a project directory to understand the layout."
                .into(),
            parameters: vec![
                ParameterSchema::string("directory", "Directory relative to the project root")
                    .with_default(DEFAULT_DIRECTORY),
            ],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let directory = call.str_arg("directory").unwrap_or(DEFAULT_DIRECTORY);
        let files = self.list(directory);
        debug!(directory, count = files.len(), "listed files");

        if files.is_empty() {
            return Ok(ToolResult::success(NAME, NO_FILES));
        }
        Ok(ToolResult::success(NAME, files.join("\n")))
    }
}
