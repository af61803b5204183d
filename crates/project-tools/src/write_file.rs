//! Write File Tool

use std::fs;
use std::path::Path;

use agent_core::{ParameterSchema, Result, Tool, ToolCall, ToolResult, ToolSchema};
use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::paths::ProjectRoot;

const NAME: &str = "write_file";

/// Overwrites a file with the given content, creating parent directories
pub struct WriteFileTool {
    root: ProjectRoot,
}

impl WriteFileTool {
    pub const fn new(root: ProjectRoot) -> Self {
        Self { root }
    }

    fn write(path: &Path, content: &str) -> anyhow::Result<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let existed = path.exists();
        fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(existed)
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Write a file in the project, replacing it entirely. \
                Missing directories are created. Always send the complete file content."
                .into(),
            parameters: vec![
                ParameterSchema::string("path", "File path relative to the project root"),
                ParameterSchema::string("content", "Complete new file content"),
            ],
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let path = call.str_arg("path").unwrap_or_default();
        let content = call.str_arg("content").unwrap_or_default();
        let resolved = self.root.resolve(path);
        info!(path = %resolved.display(), bytes = content.len(), "writing file");

        Ok(match Self::write(&resolved, content) {
            Ok(true) => ToolResult::success(NAME, format!("updated {path} ({} bytes)", content.len())),
            Ok(false) => ToolResult::success(NAME, format!("created {path} ({} bytes)", content.len())),
            Err(e) => ToolResult::failure(NAME, format!("write failed: {e:#}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(path: &str, content: &str) -> ToolCall {
        ToolCall::new(NAME).arg("path", path).arg("content", content)
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(ProjectRoot::new(dir.path()));

        let result = tool
            .execute(&call("lib/screens/history.dart", "class History {}"))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("created lib/screens/history.dart"));
        assert_eq!(
            fs::read_to_string(dir.path().join("lib/screens/history.dart")).unwrap(),
            "class History {}"
        );
    }

    #[tokio::test]
    async fn second_identical_write_leaves_same_state() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(ProjectRoot::new(dir.path()));
        let target = dir.path().join("lib/main.dart");

        tool.execute(&call("lib/main.dart", "v1")).await.unwrap();
        let first = fs::read(&target).unwrap();
        let again = tool.execute(&call("lib/main.dart", "v1")).await.unwrap();

        assert!(again.output.starts_with("updated"));
        assert_eq!(fs::read(&target).unwrap(), first);
    }

    #[tokio::test]
    async fn blocked_path_is_write_failed_observation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lib"), "a file, not a directory").unwrap();
        let tool = WriteFileTool::new(ProjectRoot::new(dir.path()));

        let result = tool.execute(&call("lib/main.dart", "x")).await.unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("write failed: "));
    }
}
