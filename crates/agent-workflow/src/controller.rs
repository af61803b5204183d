//! Workflow Controller
//!
//! `BranchCreated → AgentRunning → AwaitingApproval → Finalized | Discarded`,
//! with `Aborted` when the agent run fails. Finalization is best-effort
//! forward: stage, commit, push and pull request are each attempted in order
//! whatever the earlier ones returned, and nothing already done is undone.

use std::fmt;
use std::sync::Arc;

use agent_core::{AgentLoop, AgentOutcome};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::approval::{ApprovalGate, ApprovalRequest, Decision};
use crate::error::{Result, VcsError, WorkflowError};
use crate::session::{WorkflowSession, WorkflowState};
use crate::vcs::{PullRequest, StatusEntry, VersionControl};

const MAX_BRANCH_ATTEMPTS: u32 = 100;

/// Workflow configuration
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// Branch names are `<prefix>-<unix seconds>`
    pub branch_prefix: String,
    /// Characters of the instruction used in commit and PR titles
    pub subject_chars: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            branch_prefix: "ai-dev".into(),
            subject_chars: 50,
        }
    }
}

/// One finalization step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Stage,
    Commit,
    Push,
    PullRequest,
}

impl Step {
    pub const ALL: [Self; 4] = [Self::Stage, Self::Commit, Self::Push, Self::PullRequest];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stage => "stage",
            Self::Commit => "commit",
            Self::Push => "push",
            Self::PullRequest => "pull request",
        })
    }
}

/// Result of one finalization step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Ok(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
}

/// Everything the operator needs to know about a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub session: WorkflowSession,
    pub changed_files: Vec<StatusEntry>,
    pub steps: Vec<StepOutcome>,
}

impl WorkflowReport {
    pub const fn state(&self) -> WorkflowState {
        self.session.state
    }

    /// Status of a step, if finalization ran
    pub fn step(&self, step: Step) -> Option<&StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.status)
    }

    pub fn pull_request_url(&self) -> Option<&str> {
        match self.step(Step::PullRequest) {
            Some(StepStatus::Ok(url)) => Some(url),
            _ => None,
        }
    }

    /// Finalized or discarded with no failed step
    pub fn succeeded(&self) -> bool {
        matches!(self.state(), WorkflowState::Finalized | WorkflowState::Discarded)
            && !self
                .steps
                .iter()
                .any(|s| matches!(s.status, StepStatus::Failed(_)))
    }
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {}", self.session.id)?;
        writeln!(f, "  branch: {}", self.session.branch)?;
        writeln!(f, "  state:  {}", self.session.state)?;
        match &self.session.outcome {
            Some(AgentOutcome::Completed(output)) => writeln!(f, "  agent:  {output}")?,
            Some(AgentOutcome::Failed(reason)) => writeln!(f, "  agent failed: {reason}")?,
            None => {}
        }
        for outcome in &self.steps {
            match &outcome.status {
                StepStatus::Ok(detail) => writeln!(f, "  [ok]     {}: {detail}", outcome.step)?,
                StepStatus::Failed(reason) => writeln!(f, "  [failed] {}: {reason}", outcome.step)?,
            }
        }
        Ok(())
    }
}

/// Drives one session from branch creation to finalize or discard
pub struct WorkflowController {
    agent: AgentLoop,
    vcs: Arc<dyn VersionControl>,
    gate: Arc<dyn ApprovalGate>,
    config: WorkflowConfig,
}

impl WorkflowController {
    pub fn new(
        agent: AgentLoop,
        vcs: Arc<dyn VersionControl>,
        gate: Arc<dyn ApprovalGate>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            agent,
            vcs,
            gate,
            config,
        }
    }

    pub const fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run one session.
    ///
    /// Only a failure to create the branch or to obtain a decision is an
    /// `Err`. Agent failures and step failures end up in the report.
    #[instrument(skip_all)]
    pub async fn run(&self, instruction: &str) -> Result<WorkflowReport> {
        let started = Utc::now();
        let branch = self.create_branch(started.timestamp()).await?;
        let mut session = WorkflowSession::new(branch, instruction, started);
        info!(session = %session.id, branch = %session.branch, "branch created");

        session.transition(WorkflowState::AgentRunning);
        let outcome = self.agent.run(instruction).await;
        session.outcome = Some(outcome.clone());

        if let AgentOutcome::Failed(reason) = &outcome {
            warn!(session = %session.id, %reason, "agent run failed, aborting session");
            session.transition(WorkflowState::Aborted);
            return Ok(WorkflowReport {
                session,
                changed_files: Vec::new(),
                steps: Vec::new(),
            });
        }

        session.transition(WorkflowState::AwaitingApproval);
        let changed_files = self.vcs.status().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not list changed files");
            Vec::new()
        });

        let decision = self.gate.decide(&ApprovalRequest {
            session_id: session.id,
            branch: &session.branch,
            instruction,
            outcome: &outcome,
            changed_files: &changed_files,
        })?;
        session.record_decision(decision)?;

        let steps = match decision {
            Decision::Approve => {
                session.transition(WorkflowState::Finalized);
                self.finalize(&session, outcome.text()).await
            }
            Decision::Reject => {
                info!(session = %session.id, branch = %session.branch, "changes rejected, branch left in place");
                session.transition(WorkflowState::Discarded);
                Vec::new()
            }
        };

        Ok(WorkflowReport {
            session,
            changed_files,
            steps,
        })
    }

    async fn create_branch(&self, unix_secs: i64) -> Result<String> {
        let base = format!("{}-{unix_secs}", self.config.branch_prefix);
        let mut candidate = base.clone();
        let mut suffix = 1;

        while self
            .vcs
            .branch_exists(&candidate)
            .await
            .map_err(WorkflowError::BranchCreation)?
        {
            suffix += 1;
            if suffix > MAX_BRANCH_ATTEMPTS {
                return Err(WorkflowError::BranchCreation(VcsError::Output {
                    command: "git show-ref".into(),
                    detail: format!("no free branch name after {base}-{MAX_BRANCH_ATTEMPTS}"),
                }));
            }
            candidate = format!("{base}-{suffix}");
        }

        self.vcs
            .create_branch(&candidate)
            .await
            .map_err(WorkflowError::BranchCreation)?;
        Ok(candidate)
    }

    async fn finalize(&self, session: &WorkflowSession, output: &str) -> Vec<StepOutcome> {
        let mut steps = Vec::with_capacity(Step::ALL.len());

        for step in Step::ALL {
            let status = match self.run_step(step, session, output).await {
                Ok(detail) => {
                    info!(%step, %detail, "step succeeded");
                    StepStatus::Ok(detail)
                }
                Err(reason) => {
                    warn!(%step, %reason, "step failed, continuing");
                    StepStatus::Failed(reason)
                }
            };
            steps.push(StepOutcome { step, status });
        }

        steps
    }

    async fn run_step(
        &self,
        step: Step,
        session: &WorkflowSession,
        output: &str,
    ) -> std::result::Result<String, String> {
        let subject = truncate_chars(&session.instruction, self.config.subject_chars);
        match step {
            Step::Stage => self
                .vcs
                .stage_all()
                .await
                .map(|()| "staged all changes".to_string())
                .map_err(|e| e.to_string()),
            Step::Commit => {
                let message = commit_message(subject);
                match self.vcs.commit(&message).await {
                    Ok(true) => Ok(message),
                    Ok(false) => Err("nothing to commit".to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
            Step::Push => self
                .vcs
                .push(&session.branch)
                .await
                .map(|()| format!("pushed {}", session.branch))
                .map_err(|e| e.to_string()),
            Step::PullRequest => {
                let request = pull_request(session, subject, output);
                self.vcs
                    .create_pull_request(&request)
                    .await
                    .map_err(|e| e.to_string())
            }
        }
    }
}

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices().nth(max).map_or(text, |(i, _)| &text[..i])
}

fn commit_message(subject: &str) -> String {
    format!("feat: {subject}")
}

fn pull_request(session: &WorkflowSession, subject: &str, output: &str) -> PullRequest {
    PullRequest {
        title: format!("AI Implementation: {subject}"),
        body: format!(
            "## Instruction\n\n{}\n\n## Branch\n\n`{}`\n\n## Agent output\n\n{output}\n",
            session.instruction, session.branch
        ),
        head: session.branch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use agent_core::testing::{ScriptedPolicy, tool_call};
    use agent_core::{AgentBuilder, PolicyDecision, Tool, ToolCall, ToolResult, ToolSchema};
    use async_trait::async_trait;

    use super::*;
    use crate::approval::StaticGate;
    use crate::error::VcsResult;

    /// Records every call; fails the operations it is told to fail
    #[derive(Default)]
    struct FakeVcs {
        calls: Mutex<Vec<String>>,
        taken_branches: Mutex<VecDeque<bool>>,
        fail: Vec<&'static str>,
        nothing_staged: bool,
    }

    impl FakeVcs {
        fn failing(ops: &[&'static str]) -> Self {
            Self {
                fail: ops.to_vec(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, op: &'static str, detail: &str) -> VcsResult<()> {
            self.calls.lock().unwrap().push(format!("{op} {detail}").trim_end().to_string());
            if self.fail.contains(&op) {
                return Err(VcsError::Failed {
                    command: format!("git {op}"),
                    stderr: format!("{op} rejected"),
                });
            }
            Ok(())
        }

        fn mutated(&self) -> bool {
            self.calls()
                .iter()
                .any(|c| ["stage", "commit", "push", "pr"].iter().any(|op| c.starts_with(op)))
        }
    }

    #[async_trait]
    impl VersionControl for FakeVcs {
        async fn branch_exists(&self, _branch: &str) -> VcsResult<bool> {
            Ok(self.taken_branches.lock().unwrap().pop_front().unwrap_or(false))
        }

        async fn create_branch(&self, branch: &str) -> VcsResult<()> {
            self.record("branch", branch)
        }

        async fn status(&self) -> VcsResult<Vec<StatusEntry>> {
            Ok(vec![StatusEntry {
                code: " M".into(),
                path: "lib/main.dart".into(),
            }])
        }

        async fn stage_all(&self) -> VcsResult<()> {
            self.record("stage", "")
        }

        async fn commit(&self, message: &str) -> VcsResult<bool> {
            self.record("commit", message)?;
            Ok(!self.nothing_staged)
        }

        async fn push(&self, branch: &str) -> VcsResult<()> {
            self.record("push", branch)
        }

        async fn create_pull_request(&self, request: &PullRequest) -> VcsResult<String> {
            self.record("pr", &request.title)?;
            Ok("https://github.com/acme/calc/pull/7".into())
        }
    }

    /// In-memory stand-in for the file tools
    struct FakeFile(&'static str);

    #[async_trait]
    impl Tool for FakeFile {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                description: "fake".into(),
                parameters: Vec::new(),
                has_side_effects: false,
            }
        }

        async fn execute(&self, call: &ToolCall) -> agent_core::Result<ToolResult> {
            Ok(ToolResult::success(self.0, format!("{} ok", call.name)))
        }
    }

    fn controller(policy: ScriptedPolicy, vcs: Arc<FakeVcs>, gate: Arc<StaticGate>) -> WorkflowController {
        let agent = AgentBuilder::new()
            .policy(Arc::new(policy))
            .tool(FakeFile("list_project_files"))
            .tool(FakeFile("read_file"))
            .tool(FakeFile("write_file"))
            .max_steps(5)
            .build()
            .unwrap();
        WorkflowController::new(agent, vcs, gate, WorkflowConfig::default())
    }

    fn history_screen_script() -> ScriptedPolicy {
        ScriptedPolicy::new(vec![
            tool_call("list_project_files", &[]),
            tool_call("read_file", &[]),
            tool_call("write_file", &[]),
            PolicyDecision::Final("done".into()),
        ])
    }

    #[tokio::test]
    async fn approved_session_commits_pushes_and_opens_pr() {
        let vcs = Arc::new(FakeVcs::default());
        let gate = Arc::new(StaticGate::approve());
        let report = controller(history_screen_script(), vcs.clone(), gate.clone())
            .run("add a history screen")
            .await
            .unwrap();

        assert_eq!(report.state(), WorkflowState::Finalized);
        assert_eq!(report.session.outcome, Some(AgentOutcome::Completed("done".into())));
        assert!(report.session.branch.starts_with("ai-dev-"));
        assert_eq!(gate.asked(), 1);
        assert_eq!(report.changed_files.len(), 1);

        let calls = vcs.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], format!("branch {}", report.session.branch));
        assert_eq!(calls[1], "stage");
        assert!(calls[2].starts_with("commit feat: add a history screen"));
        assert_eq!(calls[3], format!("push {}", report.session.branch));
        assert_eq!(calls[4], "pr AI Implementation: add a history screen");

        assert_eq!(report.pull_request_url(), Some("https://github.com/acme/calc/pull/7"));
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn failed_agent_run_never_reaches_gate_or_commit() {
        let vcs = Arc::new(FakeVcs::default());
        let gate = Arc::new(StaticGate::approve());
        let policy = ScriptedPolicy::repeating(tool_call("read_file", &[]));

        let report = controller(policy, vcs.clone(), gate.clone())
            .run("loop forever")
            .await
            .unwrap();

        assert_eq!(report.state(), WorkflowState::Aborted);
        assert_eq!(
            report.session.outcome,
            Some(AgentOutcome::Failed("step limit exceeded".into()))
        );
        assert_eq!(gate.asked(), 0);
        assert!(!vcs.mutated());
        assert!(report.steps.is_empty());
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn rejection_leaves_branch_and_mutates_nothing() {
        let vcs = Arc::new(FakeVcs::default());
        let gate = Arc::new(StaticGate::reject());

        let report = controller(history_screen_script(), vcs.clone(), gate)
            .run("add a history screen")
            .await
            .unwrap();

        assert_eq!(report.state(), WorkflowState::Discarded);
        assert_eq!(vcs.calls(), vec![format!("branch {}", report.session.branch)]);
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn push_failure_still_attempts_pr() {
        let vcs = Arc::new(FakeVcs::failing(&["push"]));
        let report = controller(history_screen_script(), vcs.clone(), Arc::new(StaticGate::approve()))
            .run("add a history screen")
            .await
            .unwrap();

        assert_eq!(report.state(), WorkflowState::Finalized);
        assert!(matches!(report.step(Step::Commit), Some(StepStatus::Ok(_))));
        assert_eq!(
            report.step(Step::Push),
            Some(&StepStatus::Failed("git push failed: push rejected".into()))
        );
        assert_eq!(
            report.pull_request_url(),
            Some("https://github.com/acme/calc/pull/7")
        );
        assert!(vcs.calls().iter().any(|c| c.starts_with("pr")));
        assert!(!report.succeeded());

        let rendered = report.to_string();
        assert!(rendered.contains("[ok]     commit"));
        assert!(rendered.contains("[failed] push"));
        assert!(rendered.contains("[ok]     pull request"));
    }

    #[tokio::test]
    async fn nothing_staged_is_a_failed_commit_but_branch_is_pushed() {
        let vcs = Arc::new(FakeVcs {
            nothing_staged: true,
            ..FakeVcs::default()
        });
        let report = controller(history_screen_script(), vcs.clone(), Arc::new(StaticGate::approve()))
            .run("add a history screen")
            .await
            .unwrap();

        assert_eq!(
            report.step(Step::Commit),
            Some(&StepStatus::Failed("nothing to commit".into()))
        );
        assert_eq!(
            report.step(Step::Push),
            Some(&StepStatus::Ok(format!("pushed {}", report.session.branch)))
        );
        assert!(matches!(report.step(Step::PullRequest), Some(StepStatus::Ok(_))));
        assert_eq!(vcs.calls().len(), 5);
    }

    #[tokio::test]
    async fn every_step_is_attempted_when_all_fail() {
        let vcs = Arc::new(FakeVcs::failing(&["stage", "commit", "push", "pr"]));
        let report = controller(history_screen_script(), vcs.clone(), Arc::new(StaticGate::approve()))
            .run("add a history screen")
            .await
            .unwrap();

        assert_eq!(report.steps.len(), Step::ALL.len());
        assert!(report
            .steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Failed(_))));
        let calls = vcs.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[4], "pr AI Implementation: add a history screen");
        assert_eq!(report.state(), WorkflowState::Finalized);
    }

    #[tokio::test]
    async fn branch_name_collisions_get_a_suffix() {
        let vcs = Arc::new(FakeVcs::default());
        vcs.taken_branches.lock().unwrap().extend([true, true]);

        let report = controller(history_screen_script(), vcs.clone(), Arc::new(StaticGate::reject()))
            .run("add a history screen")
            .await
            .unwrap();

        assert!(report.session.branch.ends_with("-3"));
    }

    #[tokio::test]
    async fn branch_failure_is_fatal() {
        let vcs = Arc::new(FakeVcs::failing(&["branch"]));
        let policy = Arc::new(history_screen_script());
        let agent = AgentBuilder::new()
            .policy(policy.clone())
            .tool(FakeFile("read_file"))
            .build()
            .unwrap();
        let controller = WorkflowController::new(
            agent,
            vcs,
            Arc::new(StaticGate::approve()),
            WorkflowConfig::default(),
        );

        let err = controller.run("add a history screen").await.unwrap_err();
        assert!(matches!(err, WorkflowError::BranchCreation(_)));
        assert_eq!(policy.calls(), 0);
    }

    #[test]
    fn subjects_truncate_on_characters() {
        let long = "a".repeat(80);
        assert_eq!(truncate_chars(&long, 50).len(), 50);
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("計算履歴画面を追加して", 4), "計算履歴");
        assert_eq!(commit_message(truncate_chars(&long, 50)), format!("feat: {}", "a".repeat(50)));
    }

    #[test]
    fn pull_request_body_has_instruction_branch_and_output() {
        let session = WorkflowSession::new("ai-dev-9", "add a history screen", Utc::now());
        let pr = pull_request(&session, "add a history screen", "done");
        assert_eq!(pr.title, "AI Implementation: add a history screen");
        assert_eq!(pr.head, "ai-dev-9");
        assert!(pr.body.contains("add a history screen"));
        assert!(pr.body.contains("`ai-dev-9`"));
        assert!(pr.body.contains("done"));
    }
}
