//! Interactive terminal prompts.

use agent_workflow::{ApprovalGate, ApprovalRequest, Decision, WorkflowError};
use anyhow::Context;
use dialoguer::{Confirm, Input};

/// Ask for the instruction when none was given on the command line
pub fn instruction() -> anyhow::Result<String> {
    Input::<String>::new()
        .with_prompt("Instruction for the agent (e.g. add a history screen)")
        .interact_text()
        .context("read instruction")
}

/// Shows the agent output and changed files, then asks yes/no
pub struct TerminalGate;

impl ApprovalGate for TerminalGate {
    fn decide(&self, request: &ApprovalRequest<'_>) -> agent_workflow::Result<Decision> {
        println!("\nAgent output:\n{}\n", request.outcome.text());
        if request.changed_files.is_empty() {
            println!("No changed files on {}.", request.branch);
        } else {
            println!("Changed files on {}:", request.branch);
            for entry in request.changed_files {
                println!("  {} {}", entry.code, entry.path);
            }
        }

        let approved = Confirm::new()
            .with_prompt("Commit, push and open a pull request? (no leaves the branch as is)")
            .default(false)
            .interact()
            .map_err(|e| WorkflowError::Approval(e.to_string()))?;

        Ok(if approved {
            Decision::Approve
        } else {
            Decision::Reject
        })
    }
}
