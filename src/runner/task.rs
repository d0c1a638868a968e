use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RunnerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Received,
    Running,
    Finished,
    Error,
}

impl TaskStatus {
    /// `Finished` and `Error` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Error)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Received, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Finished)
                | (TaskStatus::Running, TaskStatus::Error)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Received => write!(f, "received"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Finished => write!(f, "finished"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub command: String,
    pub status: TaskStatus,
    /// Only set once the task is `Finished`.
    pub stdout: Option<String>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(command: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            status: TaskStatus::Received,
            stdout: None,
            exit_code: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RunnerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// `Received -> Running`
    pub fn start(&mut self) -> Result<()> {
        self.transition(TaskStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `Running -> Finished`, recording captured output.
    pub fn finish(&mut self, stdout: String, exit_code: Option<i32>) -> Result<()> {
        self.transition(TaskStatus::Finished)?;
        self.stdout = Some(stdout);
        self.exit_code = exit_code;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `Running -> Error`. Output is discarded on this path.
    pub fn fail(&mut self, error: String, exit_code: Option<i32>) -> Result<()> {
        self.transition(TaskStatus::Error)?;
        self.stdout = None;
        self.exit_code = exit_code;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}
