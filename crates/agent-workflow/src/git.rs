//! `git` and `gh` adapter.
//!
//! A small, explicit wrapper around subprocess calls in the project
//! checkout. Each call is awaited to completion before the next one starts.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{VcsError, VcsResult};
use crate::vcs::{PullRequest, StatusEntry, VersionControl};

/// Version control through the `git` and `gh` command-line tools
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: "origin".into(),
        }
    }

    /// Remote that branches are pushed to
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    async fn git(&self, args: &[&str]) -> VcsResult<Output> {
        self.run("git", args).await
    }

    async fn git_checked(&self, args: &[&str]) -> VcsResult<String> {
        self.run_checked("git", args).await
    }

    async fn run_checked(&self, program: &str, args: &[&str]) -> VcsResult<String> {
        let output = self.run(program, args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(VcsError::Failed {
                command: command_line(program, args),
                stderr: detail.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run(&self, program: &str, args: &[&str]) -> VcsResult<Output> {
        debug!(command = %command_line(program, args), "running");
        Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                command: command_line(program, args),
                source,
            })
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn branch_exists(&self, branch: &str) -> VcsResult<bool> {
        let reference = format!("refs/heads/{branch}");
        let output = self
            .git(&["show-ref", "--verify", "--quiet", &reference])
            .await?;
        Ok(output.status.success())
    }

    #[instrument(skip_all, fields(branch))]
    async fn create_branch(&self, branch: &str) -> VcsResult<()> {
        self.git_checked(&["checkout", "-b", branch]).await?;
        Ok(())
    }

    async fn status(&self) -> VcsResult<Vec<StatusEntry>> {
        let out = self.git_checked(&["status", "--porcelain=v1", "-uall"]).await?;
        out.lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_status_line)
            .collect()
    }

    async fn stage_all(&self) -> VcsResult<()> {
        self.git_checked(&["add", "-A"]).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn commit(&self, message: &str) -> VcsResult<bool> {
        let staged = self.git_checked(&["diff", "--cached", "--name-only"]).await?;
        if staged.trim().is_empty() {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        self.git_checked(&["commit", "-m", message]).await?;
        Ok(true)
    }

    #[instrument(skip_all, fields(branch))]
    async fn push(&self, branch: &str) -> VcsResult<()> {
        self.git_checked(&["push", "-u", &self.remote, branch]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(head = %request.head))]
    async fn create_pull_request(&self, request: &PullRequest) -> VcsResult<String> {
        let args = [
            "pr",
            "create",
            "--title",
            request.title.as_str(),
            "--body",
            request.body.as_str(),
            "--head",
            request.head.as_str(),
        ];
        let out = self.run_checked("gh", &args).await?;

        // gh prints progress lines before the URL
        out.lines()
            .map(str::trim)
            .rfind(|line| line.starts_with("http"))
            .map(str::to_string)
            .ok_or_else(|| VcsError::Output {
                command: "gh pr create".into(),
                detail: format!("no pull request URL in {:?}", out.trim()),
            })
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.contains(char::is_whitespace) {
            line.push_str(&format!("{arg:?}"));
        } else {
            line.push_str(arg);
        }
    }
    line
}

fn parse_status_line(line: &str) -> VcsResult<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 || !line.is_char_boundary(2) || !line.is_char_boundary(3) {
        return Err(VcsError::Output {
            command: "git status".into(),
            detail: format!("unexpected porcelain line: '{line}'"),
        });
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}
