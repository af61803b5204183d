//! Read File Tool

use std::fs;

use agent_core::{ParameterSchema, Result, Tool, ToolCall, ToolResult, ToolSchema};
use async_trait::async_trait;
use tracing::debug;

use crate::paths::ProjectRoot;

const NAME: &str = "read_file";

/// Returns a file's text, or an observation explaining why it could not
pub struct ReadFileTool {
    root: ProjectRoot,
}

impl ReadFileTool {
    pub const fn new(root: ProjectRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Read a text file from the project and return its full contents.".into(),
            parameters: vec![ParameterSchema::string(
                "path",
                "File path relative to the project root (e.g. 'lib/main.dart')",
            )],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let path = call.str_arg("path").unwrap_or_default();
        let resolved = self.root.resolve(path);
        debug!(path = %resolved.display(), "reading file");

        if !resolved.exists() {
            return Ok(ToolResult::failure(NAME, format!("not found: {path}")));
        }

        Ok(match fs::read_to_string(&resolved) {
            Ok(content) => ToolResult::success(NAME, content),
            Err(e) => ToolResult::failure(NAME, format!("read failed: {e}")),
        })
    }
}
