use std::path::PathBuf;
use std::time::Duration;

use agent_core::provider::DEFAULT_MODEL;
use agent_core::{GenerationOptions, PolicyConfig};
use agent_workflow::WorkflowConfig;
use clap::Parser;
use project_tools::CheckCommand;

#[derive(Parser, Debug)]
#[command(
    name = "code-agent",
    version,
    about = "Let a local model change a project on a fresh branch, then commit and open a PR after you approve"
)]
pub struct Cli {
    /// What the agent should do (asked for interactively when omitted)
    pub instruction: Option<String>,

    /// Project checkout the tools and git operate in
    #[arg(long, env = "AGENT_PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// Ollama model name
    #[arg(long, env = "AGENT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "AGENT_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// Policy queries allowed before the run fails
    #[arg(long, env = "AGENT_MAX_STEPS", default_value_t = 25)]
    pub max_steps: usize,

    /// Retries for transient model errors
    #[arg(long, env = "AGENT_POLICY_RETRIES", default_value_t = 2)]
    pub policy_retries: u32,

    #[arg(long, env = "AGENT_BRANCH_PREFIX", default_value = "ai-dev")]
    pub branch_prefix: String,

    /// Remote the session branch is pushed to
    #[arg(long, env = "AGENT_GIT_REMOTE", default_value = "origin")]
    pub remote: String,

    /// Command exposed to the agent as `run_checks` (e.g. "flutter analyze")
    #[arg(long, env = "AGENT_CHECK_COMMAND")]
    pub check_command: Option<String>,

    #[arg(long, env = "AGENT_CHECK_TIMEOUT_SECS", default_value_t = 300)]
    pub check_timeout_secs: u64,

    /// Approve the changes without asking
    #[arg(short, long)]
    pub yes: bool,
}

impl Cli {
    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            generation: GenerationOptions {
                model: self.model.clone(),
                temperature: self.temperature,
                ..GenerationOptions::default()
            },
            max_retries: self.policy_retries,
            ..PolicyConfig::default()
        }
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            branch_prefix: self.branch_prefix.clone(),
            ..WorkflowConfig::default()
        }
    }

    pub fn check_command(&self) -> Option<CheckCommand> {
        self.check_command
            .as_deref()
            .and_then(CheckCommand::parse)
            .map(|cmd| cmd.with_timeout(Duration::from_secs(self.check_timeout_secs)))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_flow_into_configs() {
        let cli = Cli::try_parse_from([
            "code-agent",
            "add a history screen",
            "--model",
            "qwen2.5-coder:7b",
            "--policy-retries",
            "4",
            "--branch-prefix",
            "bot",
            "--check-command",
            "flutter analyze",
            "--check-timeout-secs",
            "60",
            "--yes",
        ])
        .unwrap();

        assert_eq!(cli.instruction.as_deref(), Some("add a history screen"));
        assert!(cli.yes);

        let policy = cli.policy_config();
        assert_eq!(policy.generation.model, "qwen2.5-coder:7b");
        assert_eq!(policy.max_retries, 4);
        assert_eq!(cli.workflow_config().branch_prefix, "bot");

        let checks = cli.check_command().unwrap();
        assert_eq!(checks.program, "flutter");
        assert_eq!(checks.args, vec!["analyze"]);
        assert_eq!(checks.timeout, Duration::from_secs(60));
    }

    #[test]
    fn blank_check_command_is_ignored() {
        let cli = Cli::try_parse_from(["code-agent", "--check-command", "  "]).unwrap();
        assert!(cli.check_command().is_none());
        assert!(cli.instruction.is_none());
    }
}
