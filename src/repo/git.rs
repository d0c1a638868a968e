use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Result, RunnerError};

/// Result of a successful pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// New commits were fast-forwarded into the working tree.
    Updated,
    /// The remote had nothing new.
    AlreadyUpToDate,
}

/// Thin wrapper around the `git` command line client.
///
/// Terminal prompts are disabled so a remote that asks for credentials fails
/// instead of blocking the request.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full checkout of `url` into `directory`, naming the remote `remote_name`.
    ///
    /// Fails if `directory` exists and is not empty.
    pub async fn clone_repo(&self, url: &str, remote_name: &str, directory: &Path) -> Result<()> {
        if let Some(parent) = directory.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RunnerError::Sync(format!(
                    "failed to create build root {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut cmd = self.command();
        cmd.arg("clone")
            .arg("--origin")
            .arg(remote_name)
            .arg("--")
            .arg(url)
            .arg(directory);

        self.run(cmd, "clone").await?;
        Ok(())
    }

    /// Fast-forward the checkout at `directory` from `remote_name`.
    pub async fn pull(&self, directory: &Path, remote_name: &str) -> Result<PullOutcome> {
        let mut cmd = self.command();
        cmd.arg("-C")
            .arg(directory)
            .arg("pull")
            .arg("--ff-only")
            .arg(remote_name);

        let stdout = self.run(cmd, "pull").await?;
        if is_up_to_date(&stdout) {
            Ok(PullOutcome::AlreadyUpToDate)
        } else {
            Ok(PullOutcome::Updated)
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    async fn run(&self, mut cmd: Command, action: &str) -> Result<String> {
        let output = cmd.output().await.map_err(|e| {
            RunnerError::Sync(format!(
                "failed to run {} {}: {}",
                self.program.display(),
                action,
                e
            ))
        })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr.trim();
        Err(RunnerError::Sync(if message.is_empty() {
            format!("git {} exited with {:?}", action, output.status.code())
        } else {
            format!("git {}: {}", action, message)
        }))
    }
}

fn is_up_to_date(stdout: &str) -> bool {
    // Older git prints "Already up-to-date."
    stdout
        .lines()
        .any(|line| matches!(line.trim(), "Already up to date." | "Already up-to-date."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_up_to_date_output() {
        assert!(is_up_to_date("Already up to date.\n"));
        assert!(is_up_to_date("Already up-to-date.\n"));
        assert!(!is_up_to_date(
            "Updating 1a2b3c4..5d6e7f8\nFast-forward\n README | 1 +\n"
        ));
        assert!(!is_up_to_date(""));
    }

    #[tokio::test]
    async fn missing_binary_is_a_sync_failure() {
        let git = GitCli::new("/nonexistent/git-binary");
        let dir = tempfile::TempDir::new().unwrap();
        let err = git.pull(dir.path(), "origin").await.unwrap_err();
        assert!(matches!(err, RunnerError::Sync(_)));
    }
}
