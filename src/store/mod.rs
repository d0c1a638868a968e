//! Durable key-value persistence for task and repository records.
//!
//! The core only needs create, get-by-id, full scan and update-in-place per
//! collection. Each call is atomic on its own; there are no cross-record
//! transactions.
//!
//! - [`DiskStore`]: redb-backed store used by the server
//! - [`MemoryStore`]: in-process store for tests and throwaway runs

pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::error::RunnerError;
use crate::repo::Repository;
use crate::runner::Task;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open database: {0}")]
    OpenDatabase(#[from] redb::DatabaseError),

    #[error("failed to begin transaction: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("failed to open table: {0}")]
    Table(#[from] redb::TableError),

    #[error("failed to commit transaction: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("failed to encode record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{collection} record {id} already exists")]
    Duplicate { collection: &'static str, id: Uuid },

    #[error("{collection} record {id} does not exist")]
    Missing { collection: &'static str, id: Uuid },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Record persistence used by the job runner and repository manager.
pub trait RecordStore: Send + Sync {
    /// Persist a new task. Fails if the id is already taken.
    fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Overwrite an existing task. Fails if the id is unknown.
    fn update_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Persist a new repository. Fails if the id is already taken.
    fn insert_repository(&self, repo: &Repository) -> Result<(), StoreError>;

    fn get_repository(&self, id: Uuid) -> Result<Option<Repository>, StoreError>;

    fn list_repositories(&self) -> Result<Vec<Repository>, StoreError>;

    /// Overwrite an existing repository. Fails if the id is unknown.
    fn update_repository(&self, repo: &Repository) -> Result<(), StoreError>;
}

/// Run a store call on the blocking pool.
///
/// redb commits fsync, so writes on the request path stay off the runtime
/// worker threads.
pub async fn blocking<T, F>(store: &Arc<dyn RecordStore>, f: F) -> Result<T, RunnerError>
where
    F: FnOnce(&dyn RecordStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    Ok(tokio::task::spawn_blocking(move || f(store.as_ref())).await??)
}
