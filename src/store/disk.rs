use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::repo::Repository;
use crate::runner::Task;
use crate::store::{RecordStore, StoreError};

type RecordTable = TableDefinition<'static, u128, &'static [u8]>;

/// Key: task id (u128), Value: JSON-encoded Task
const TASKS_TABLE: RecordTable = TableDefinition::new("tasks");

/// Key: repository id (u128), Value: JSON-encoded Repository
const REPOSITORIES_TABLE: RecordTable = TableDefinition::new("repositories");

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Insert,
    Update,
}

/// Record store backed by a single redb file.
pub struct DiskStore {
    db: Database,
    path: PathBuf,
}

impl DiskStore {
    /// Create or open the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let db = Database::create(&path)?;

        // Create both tables up front so reads on a fresh database succeed
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(TASKS_TABLE)?;
            write_txn.open_table(REPOSITORIES_TABLE)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened record store");

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn put<T: Serialize>(
        &self,
        table_def: RecordTable,
        collection: &'static str,
        id: Uuid,
        record: &T,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec(record)?;
        let key = id.as_u128();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table_def)?;
            let exists = table.get(key)?.is_some();
            match mode {
                WriteMode::Insert if exists => {
                    return Err(StoreError::Duplicate { collection, id });
                }
                WriteMode::Update if !exists => {
                    return Err(StoreError::Missing { collection, id });
                }
                _ => {}
            }
            table.insert(key, serialized.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        table_def: RecordTable,
        id: Uuid,
    ) -> Result<Option<T>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_def)?;

        let result = match table.get(id.as_u128())? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };

        Ok(result)
    }

    fn list<T: DeserializeOwned>(&self, table_def: RecordTable) -> Result<Vec<T>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_def)?;

        let mut records = Vec::new();
        for item in table.iter()? {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(value.value())?);
        }

        Ok(records)
    }
}

impl RecordStore for DiskStore {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.put(TASKS_TABLE, "task", task.id, task, WriteMode::Insert)
    }

    fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.get(TASKS_TABLE, id)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.list(TASKS_TABLE)
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.put(TASKS_TABLE, "task", task.id, task, WriteMode::Update)
    }

    fn insert_repository(&self, repo: &Repository) -> Result<(), StoreError> {
        self.put(
            REPOSITORIES_TABLE,
            "repository",
            repo.id,
            repo,
            WriteMode::Insert,
        )
    }

    fn get_repository(&self, id: Uuid) -> Result<Option<Repository>, StoreError> {
        self.get(REPOSITORIES_TABLE, id)
    }

    fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        self.list(REPOSITORIES_TABLE)
    }

    fn update_repository(&self, repo: &Repository) -> Result<(), StoreError> {
        self.put(
            REPOSITORIES_TABLE,
            "repository",
            repo.id,
            repo,
            WriteMode::Update,
        )
    }
}
