use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

/// Outcome of running one task command to completion.
#[derive(Debug)]
pub struct ExecutionResult {
    pub task_id: Uuid,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub error: Option<String>,
}

/// Runs task commands through a shell (`<shell> -c <command>`).
///
/// Commands are not sandboxed and have no time limit.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl CommandExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub async fn execute(&self, task_id: Uuid, command: &str) -> ExecutionResult {
        tracing::info!(task_id = %task_id, command, shell = %self.shell, "Executing task");

        let result = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        Self::process_output(task_id, result)
    }

    fn process_output(
        task_id: Uuid,
        result: Result<std::process::Output, std::io::Error>,
    ) -> ExecutionResult {
        match result {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = output.status.code();
                let success = output.status.success();

                let error = if success {
                    None
                } else if stderr.trim().is_empty() {
                    // No exit code means the process was killed by a signal
                    Some(format!("Exit code: {:?}", exit_code))
                } else {
                    Some(stderr)
                };

                tracing::info!(
                    task_id = %task_id,
                    success,
                    exit_code = ?exit_code,
                    "Task command exited"
                );

                ExecutionResult {
                    task_id,
                    success,
                    exit_code,
                    stdout,
                    error,
                }
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Task command failed to start");
                ExecutionResult {
                    task_id,
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
