//! code-agent
//!
//! Cuts a branch, lets the model work on the project through the file
//! tools, and finalizes through git and gh once a human approves.

mod cli;
mod prompt;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentBuilder, LlmPolicy, LlmProvider};
use agent_runtime::OllamaProvider;
use agent_workflow::{ApprovalGate, GitCli, StaticGate, WorkflowController, WorkflowReport};
use project_tools::builtin_registry;

use crate::cli::Cli;
use crate::prompt::TerminalGate;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            println!("{report}");
            if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<WorkflowReport> {
    let instruction = match &cli.instruction {
        Some(instruction) => instruction.clone(),
        None => prompt::instruction()?,
    };
    let instruction = instruction.trim();
    if instruction.is_empty() {
        bail!("instruction is empty");
    }

    let provider = Arc::new(OllamaProvider::from_env());
    match provider.health_check().await {
        Ok(true) => info!(model = %cli.model, "connected to Ollama"),
        Ok(false) | Err(_) => {
            warn!("Ollama not available, the agent run will likely fail");
            warn!("make sure Ollama is running: ollama serve");
        }
    }

    let tools = builtin_registry(&cli.project_root, cli.check_command());
    info!(tools = ?tools.names(), root = %cli.project_root.display(), "tools registered");

    let policy = LlmPolicy::new(provider, cli.policy_config());
    let agent = AgentBuilder::new()
        .policy(Arc::new(policy))
        .tools(tools)
        .max_steps(cli.max_steps)
        .build()
        .context("build agent")?;

    let vcs = Arc::new(GitCli::new(&cli.project_root).with_remote(&cli.remote));
    let gate: Arc<dyn ApprovalGate> = if cli.yes {
        Arc::new(StaticGate::approve())
    } else {
        Arc::new(TerminalGate)
    };

    let controller = WorkflowController::new(agent, vcs, gate, cli.workflow_config());
    controller
        .run(instruction)
        .await
        .context("workflow session failed")
}
