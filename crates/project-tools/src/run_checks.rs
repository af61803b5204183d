//! Run Checks Tool
//!
//! Runs the project's configured check command (static analysis, tests) so
//! the policy can see whether its edits hold up.

use std::process::Command;
use std::time::Duration;

use agent_core::{AgentError, Result, Tool, ToolCall, ToolResult, ToolSchema};
use async_trait::async_trait;
use tracing::info;

use crate::paths::ProjectRoot;
use crate::process::{CommandOutput, run_with_timeout};

const NAME: &str = "run_checks";

/// Check command configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CheckCommand {
    /// Split a command line on whitespace (no shell quoting)
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            timeout: Duration::from_secs(300),
            output_limit_bytes: 64 * 1024,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs the configured check command in the project root
pub struct RunChecksTool {
    root: ProjectRoot,
    command: CheckCommand,
}

impl RunChecksTool {
    pub const fn new(root: ProjectRoot, command: CheckCommand) -> Self {
        Self { root, command }
    }

    fn render(&self, out: &CommandOutput) -> ToolResult {
        let mut body = String::new();
        for stream in [&out.stdout, &out.stderr] {
            if !stream.trim().is_empty() {
                body.push('\n');
                body.push_str(stream.trim_end());
            }
        }
        if out.truncated_bytes > 0 {
            body.push_str(&format!("\n[output truncated {} bytes]", out.truncated_bytes));
        }

        if out.timed_out {
            ToolResult::failure(
                NAME,
                format!("checks timed out after {}s{body}", self.command.timeout.as_secs()),
            )
        } else if out.status.success() {
            ToolResult::success(NAME, format!("checks passed{body}"))
        } else {
            let code = out
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            ToolResult::failure(NAME, format!("checks failed (exit {code}){body}"))
        }
    }
}

#[async_trait]
impl Tool for RunChecksTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: format!(
                "Run the project checks (`{}`) and report any problems. Use after writing files.",
                self.command.display()
            ),
            parameters: Vec::new(),
            has_side_effects: false,
        }
    }

    async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
        info!(command = %self.command.display(), "running checks");

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args).current_dir(self.root.path());
        let timeout = self.command.timeout;
        let limit = self.command.output_limit_bytes;

        let output = tokio::task::spawn_blocking(move || run_with_timeout(cmd, timeout, limit))
            .await
            .map_err(|e| AgentError::ToolExecution(format!("check runner stopped: {e}")))?;

        Ok(match output {
            Ok(out) => self.render(&out),
            Err(e) => ToolResult::failure(
                NAME,
                format!("could not run `{}`: {e:#}", self.command.display()),
            ),
        })
    }
}
