use thiserror::Error;
use uuid::Uuid;

use crate::runner::TaskStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(Uuid),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Repository sync failed: {0}")]
    Sync(String),

    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Invalid task transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RunnerError {
    /// True for lookups that found no record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RunnerError::TaskNotFound(_) | RunnerError::RepositoryNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
