use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::repo::Repository;
use crate::runner::Task;
use crate::store::{RecordStore, StoreError};

/// Record store held entirely in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    repositories: RwLock<HashMap<Uuid, Repository>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert<T: Clone>(
    map: &RwLock<HashMap<Uuid, T>>,
    collection: &'static str,
    id: Uuid,
    record: &T,
) -> Result<(), StoreError> {
    let mut map = map.write().map_err(|_| StoreError::Poisoned)?;
    if map.contains_key(&id) {
        return Err(StoreError::Duplicate { collection, id });
    }
    map.insert(id, record.clone());
    Ok(())
}

fn update<T: Clone>(
    map: &RwLock<HashMap<Uuid, T>>,
    collection: &'static str,
    id: Uuid,
    record: &T,
) -> Result<(), StoreError> {
    let mut map = map.write().map_err(|_| StoreError::Poisoned)?;
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = record.clone();
            Ok(())
        }
        None => Err(StoreError::Missing { collection, id }),
    }
}

fn get<T: Clone>(map: &RwLock<HashMap<Uuid, T>>, id: Uuid) -> Result<Option<T>, StoreError> {
    let map = map.read().map_err(|_| StoreError::Poisoned)?;
    Ok(map.get(&id).cloned())
}

fn list<T: Clone>(map: &RwLock<HashMap<Uuid, T>>) -> Result<Vec<T>, StoreError> {
    let map = map.read().map_err(|_| StoreError::Poisoned)?;
    Ok(map.values().cloned().collect())
}

impl RecordStore for MemoryStore {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        insert(&self.tasks, "task", task.id, task)
    }

    fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        get(&self.tasks, id)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        list(&self.tasks)
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        update(&self.tasks, "task", task.id, task)
    }

    fn insert_repository(&self, repo: &Repository) -> Result<(), StoreError> {
        insert(&self.repositories, "repository", repo.id, repo)
    }

    fn get_repository(&self, id: Uuid) -> Result<Option<Repository>, StoreError> {
        get(&self.repositories, id)
    }

    fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        list(&self.repositories)
    }

    fn update_repository(&self, repo: &Repository) -> Result<(), StoreError> {
        update(&self.repositories, "repository", repo.id, repo)
    }
}
