
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

use jobsync::error::RunnerError;
use jobsync::repo::Repository;
use jobsync::runner::{Task, TaskStatus};
use jobsync::store::{DiskStore, MemoryStore, RecordStore, StoreError};
use test_harness::{memory_store, test_runner, wait_for_terminal};

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_submit_returns_received_immediately() {
    let runner = test_runner(memory_store());

    let start = std::time::Instant::now();
    let task = runner.submit("sleep 2; echo done").unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(task.status, TaskStatus::Received);
    assert_eq!(task.command, "sleep 2; echo done");
    assert!(task.stdout.is_none());

    // The command is still sleeping, so it cannot have finished yet
    let stored = runner.status(task.id).unwrap();
    assert!(!stored.status.is_terminal());
}

#[tokio::test]
async fn test_ls_end_to_end() {
    let runner = test_runner(memory_store());

    let task = runner.submit("ls").unwrap();
    let done = wait_for_terminal(&runner, task.id, TIMEOUT).await;

    let expected = std::process::Command::new("sh")
        .arg("-c")
        .arg("ls")
        .output()
        .unwrap();

    assert_eq!(done.status, TaskStatus::Finished);
    assert_eq!(
        done.stdout.as_deref(),
        Some(String::from_utf8_lossy(&expected.stdout).as_ref())
    );
    assert_eq!(done.exit_code, Some(0));
    assert!(done.error.is_none());
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn test_failed_command_ends_in_error_without_stdout() {
    let runner = test_runner(memory_store());

    let task = runner.submit("echo partial; exit 2").unwrap();
    let done = wait_for_terminal(&runner, task.id, TIMEOUT).await;

    assert_eq!(done.status, TaskStatus::Error);
    assert!(done.stdout.is_none());
    assert_eq!(done.exit_code, Some(2));
    assert!(done.error.is_some());
}

#[tokio::test]
async fn test_unknown_command_ends_in_error() {
    let runner = test_runner(memory_store());

    let task = runner.submit("nonexistent_command_12345").unwrap();
    let done = wait_for_terminal(&runner, task.id, TIMEOUT).await;

    assert_eq!(done.status, TaskStatus::Error);
    assert!(done.stdout.is_none());
    assert!(done.error.unwrap().contains("Command execution failed"));
}

#[tokio::test]
async fn test_observed_statuses_follow_lifecycle() {
    let runner = test_runner(memory_store());

    for command in ["sleep 0.3; echo ok", "sleep 0.3; exit 1"] {
        let task = runner.submit(command).unwrap();

        let mut observed = vec![task.status];
        let start = std::time::Instant::now();
        loop {
            let status = runner.status(task.id).unwrap().status;
            if observed.last() != Some(&status) {
                observed.push(status);
            }
            if status.is_terminal() {
                break;
            }
            assert!(start.elapsed() < TIMEOUT, "task never finished");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let valid = [
            vec![TaskStatus::Received, TaskStatus::Running, TaskStatus::Finished],
            vec![TaskStatus::Received, TaskStatus::Running, TaskStatus::Error],
        ];
        assert!(
            valid.iter().any(|seq| seq.starts_with(&observed)),
            "unexpected status sequence {:?}",
            observed
        );
        assert!(observed.contains(&TaskStatus::Running));
    }
}

#[tokio::test]
async fn test_empty_command_is_rejected() {
    let store = memory_store();
    let runner = test_runner(store.clone());

    let err = runner.submit("   ").unwrap_err();

    assert!(matches!(err, RunnerError::Validation(_)));
    assert!(store.list_tasks().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let runner = test_runner(memory_store());
    let id = Uuid::new_v4();

    let err = runner.status(id).unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, RunnerError::TaskNotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_all_returns_every_task_oldest_first() {
    let runner = test_runner(memory_store());

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(runner.submit(&format!("echo {}", i)).unwrap().id);
        // Distinct creation timestamps
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let tasks = runner.all().unwrap();
    assert_eq!(tasks.len(), 5);
    assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), ids);

    for id in ids {
        let done = wait_for_terminal(&runner, id, TIMEOUT).await;
        assert_eq!(done.status, TaskStatus::Finished);
    }
}

#[tokio::test]
async fn test_concurrent_submissions_all_complete() {
    let runner = test_runner(memory_store());

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move { runner.submit(&format!("echo task-{}", i)).unwrap() })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let task = handle.await.unwrap();
        let done = wait_for_terminal(&runner, task.id, TIMEOUT).await;
        assert_eq!(done.stdout, Some(format!("task-{}\n", i)));
    }
}

#[tokio::test]
async fn test_recover_relaunches_received_and_interrupts_running() {
    let store = memory_store();

    let pending = Task::new("echo resumed".to_string());
    store.insert_task(&pending).unwrap();

    let mut running = Task::new("sleep 100".to_string());
    store.insert_task(&running).unwrap();
    running.start().unwrap();
    store.update_task(&running).unwrap();

    let mut finished = Task::new("true".to_string());
    store.insert_task(&finished).unwrap();
    finished.start().unwrap();
    finished.finish(String::new(), Some(0)).unwrap();
    store.update_task(&finished).unwrap();

    let runner = test_runner(store);
    let report = runner.recover().unwrap();

    assert_eq!(report.relaunched, 1);
    assert_eq!(report.interrupted, 1);

    let interrupted = runner.status(running.id).unwrap();
    assert_eq!(interrupted.status, TaskStatus::Error);
    assert!(interrupted.stdout.is_none());

    let resumed = wait_for_terminal(&runner, pending.id, TIMEOUT).await;
    assert_eq!(resumed.status, TaskStatus::Finished);
    assert_eq!(resumed.stdout.as_deref(), Some("resumed\n"));

    assert_eq!(runner.status(finished.id).unwrap(), finished);
}

#[tokio::test]
async fn test_tasks_persist_in_disk_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.redb");

    let id = {
        let store: Arc<dyn RecordStore> = Arc::new(DiskStore::open(&path).unwrap());
        let runner = test_runner(store);
        let task = runner.submit("echo persisted").unwrap();
        let done = wait_for_terminal(&runner, task.id, TIMEOUT).await;
        assert_eq!(done.status, TaskStatus::Finished);
        task.id
    };

    // Let the detached execution drop its store handle
    tokio::time::sleep(Duration::from_millis(100)).await;

    let store: Arc<dyn RecordStore> = Arc::new(DiskStore::open(&path).unwrap());
    let runner = test_runner(store);
    let task = runner.status(id).unwrap();
    assert_eq!(task.status, TaskStatus::Finished);
    assert_eq!(task.stdout.as_deref(), Some("persisted\n"));
}

/// Store whose task updates can be switched off to simulate a write failure.
struct FlakyStore {
    inner: MemoryStore,
    reject_updates: AtomicBool,
}

impl RecordStore for FlakyStore {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.inner.insert_task(task)
    }

    fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.inner.get_task(id)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.inner.list_tasks()
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Poisoned);
        }
        self.inner.update_task(task)
    }

    fn insert_repository(&self, repo: &Repository) -> Result<(), StoreError> {
        self.inner.insert_repository(repo)
    }

    fn get_repository(&self, id: Uuid) -> Result<Option<Repository>, StoreError> {
        self.inner.get_repository(id)
    }

    fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        self.inner.list_repositories()
    }

    fn update_repository(&self, repo: &Repository) -> Result<(), StoreError> {
        self.inner.update_repository(repo)
    }
}

#[tokio::test]
async fn test_persistence_failure_leaves_last_state_and_keeps_serving() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        reject_updates: AtomicBool::new(true),
    });
    let runner = test_runner(store.clone());

    let stuck = runner.submit("echo never recorded").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The Running transition could not be stored, so the task stays Received
    let task = runner.status(stuck.id).unwrap();
    assert_eq!(task.status, TaskStatus::Received);

    store.reject_updates.store(false, Ordering::SeqCst);
    let next = runner.submit("echo still serving").unwrap();
    let done = wait_for_terminal(&runner, next.id, TIMEOUT).await;
    assert_eq!(done.status, TaskStatus::Finished);
}
