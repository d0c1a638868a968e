use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Result, RunnerError};
use crate::runner::executor::{CommandExecutor, ExecutionResult};
use crate::runner::task::{Task, TaskStatus};
use crate::store::RecordStore;

/// Counts from [`JobRunner::recover`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// `Received` tasks that were launched again.
    pub relaunched: usize,
    /// `Running` tasks moved to `Error`.
    pub interrupted: usize,
}

/// Accepts commands, runs them in the background and records the outcome.
///
/// The store is the only state shared between the request path and the
/// background executions; every transition is written there before the next
/// one starts.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn RecordStore>,
    executor: CommandExecutor,
}

impl JobRunner {
    pub fn new(store: Arc<dyn RecordStore>, executor: CommandExecutor) -> Self {
        Self { store, executor }
    }

    /// Persist a new `Received` task and start running it in the background.
    ///
    /// Returns as soon as the record is stored. Must be called from within a
    /// tokio runtime.
    pub fn submit(&self, command: &str) -> Result<Task> {
        if command.trim().is_empty() {
            return Err(RunnerError::Validation(
                "command must not be empty".to_string(),
            ));
        }

        let task = Task::new(command.to_string());
        self.store.insert_task(&task)?;
        tracing::info!(task_id = %task.id, command, "Task received");

        self.spawn(task.clone());
        Ok(task)
    }

    pub fn status(&self, id: Uuid) -> Result<Task> {
        self.store.get_task(id)?.ok_or(RunnerError::TaskNotFound(id))
    }

    /// All tasks, oldest first.
    pub fn all(&self) -> Result<Vec<Task>> {
        let mut tasks = self.store.list_tasks()?;
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    /// Resume bookkeeping left over from a previous process.
    ///
    /// Tasks that never started are launched again. Tasks caught mid-run lost
    /// their process with the old server and are marked `Error`.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for mut task in self.all()? {
            match task.status {
                TaskStatus::Received => {
                    tracing::info!(task_id = %task.id, "Relaunching task received before restart");
                    self.spawn(task);
                    report.relaunched += 1;
                }
                TaskStatus::Running => {
                    task.fail("interrupted by server restart".to_string(), None)?;
                    self.store.update_task(&task)?;
                    tracing::warn!(task_id = %task.id, "Task interrupted by restart");
                    report.interrupted += 1;
                }
                TaskStatus::Finished | TaskStatus::Error => {}
            }
        }

        Ok(report)
    }

    fn spawn(&self, task: Task) {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.execute(task).await;
        });
    }

    /// Drive one task through `Running` to `Finished` or `Error`.
    ///
    /// Failures here are logged and leave the task in its last persisted
    /// state; nothing is propagated since the submitter is long gone.
    async fn execute(&self, mut task: Task) {
        let task_id = task.id;

        if let Err(e) = task.start() {
            tracing::warn!(task_id = %task_id, error = %e, "Task cannot be started");
            return;
        }
        if !self.persist(&task) {
            return;
        }

        let ExecutionResult {
            success,
            exit_code,
            stdout,
            error,
            ..
        } = self.executor.execute(task_id, &task.command).await;

        let transition = if success {
            task.finish(stdout, exit_code)
        } else {
            let error = error.unwrap_or_else(|| format!("Exit code: {:?}", exit_code));
            task.fail(RunnerError::Execution(error).to_string(), exit_code)
        };
        if let Err(e) = transition {
            tracing::error!(task_id = %task_id, error = %e, "Task transition rejected");
            return;
        }

        if self.persist(&task) {
            tracing::info!(task_id = %task_id, status = %task.status, "Task completed");
        }
    }

    fn persist(&self, task: &Task) -> bool {
        match self.store.update_task(task) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    task_id = %task.id,
                    status = %task.status,
                    error = %e,
                    "Failed to persist task state"
                );
                false
            }
        }
    }
}
