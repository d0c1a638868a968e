use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Result, RunnerError};
use crate::repo::git::{GitCli, PullOutcome};
use crate::repo::repository::{validate_remote_name, CloneStatus, Repository};
use crate::store::{self, RecordStore};

/// Outcome of a create request. The record is kept even when the clone fails,
/// so the caller can report both.
#[derive(Debug)]
pub struct CreateOutcome {
    pub repository: Repository,
    pub error: Option<RunnerError>,
}

impl CreateOutcome {
    pub fn into_result(self) -> Result<Repository> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.repository),
        }
    }
}

/// Owns repository records and their checkouts under the build root.
#[derive(Clone)]
pub struct RepositoryManager {
    store: Arc<dyn RecordStore>,
    git: GitCli,
    build_root: PathBuf,
}

impl RepositoryManager {
    pub fn new(store: Arc<dyn RecordStore>, git: GitCli, build_root: PathBuf) -> Self {
        Self {
            store,
            git,
            build_root,
        }
    }

    /// Register `url` and clone it into `<build_root>/<fingerprint(url)>`.
    ///
    /// The record is persisted as `Cloning` before the clone starts and moved
    /// to `Ready` or `Failed` afterwards. Only validation and persistence
    /// errors are returned as `Err`; a clone failure comes back inside the
    /// outcome alongside the stored record.
    pub async fn create(&self, url: &str, remote_name: &str) -> Result<CreateOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RunnerError::Validation("url must not be empty".to_string()));
        }
        validate_remote_name(remote_name)?;

        let mut repo = Repository::new(&self.build_root, url.to_string(), remote_name.to_string());
        let record = repo.clone();
        store::blocking(&self.store, move |s| s.insert_repository(&record)).await?;

        tracing::info!(
            repo_id = %repo.id,
            url = %repo.url,
            directory = %repo.directory.display(),
            "Cloning repository"
        );

        let error = match self
            .git
            .clone_repo(&repo.url, &repo.remote_name, &repo.directory)
            .await
        {
            Ok(()) => {
                repo.clone_status = CloneStatus::Ready;
                tracing::info!(repo_id = %repo.id, "Repository cloned");
                None
            }
            Err(e) => {
                repo.clone_status = CloneStatus::Failed;
                repo.clone_error = Some(e.to_string());
                tracing::warn!(repo_id = %repo.id, error = %e, "Repository clone failed");
                Some(e)
            }
        };

        let record = repo.clone();
        if let Err(e) = store::blocking(&self.store, move |s| s.update_repository(&record)).await
        {
            // Left as Cloning until the next `recover`
            tracing::error!(
                repo_id = %repo.id,
                clone_status = %repo.clone_status,
                error = %e,
                "Failed to persist clone outcome"
            );
            return Err(e);
        }

        Ok(CreateOutcome {
            repository: repo,
            error,
        })
    }

    /// Fast-forward the checkout of repository `id` from its remote.
    ///
    /// "Already up to date" is a success. The stored record is not modified.
    pub async fn pull(&self, id: Uuid) -> Result<Repository> {
        let repo = store::blocking(&self.store, move |s| s.get_repository(id))
            .await?
            .ok_or(RunnerError::RepositoryNotFound(id))?;

        // Records written before names were checked may hold anything
        validate_remote_name(&repo.remote_name)?;

        match self.git.pull(&repo.directory, &repo.remote_name).await {
            Ok(PullOutcome::AlreadyUpToDate) => {
                tracing::debug!(repo_id = %id, "Repository already up to date");
            }
            Ok(PullOutcome::Updated) => {
                tracing::info!(repo_id = %id, "Repository updated");
            }
            Err(e) => {
                tracing::warn!(repo_id = %id, error = %e, "Repository pull failed");
                return Err(e);
            }
        }

        Ok(repo)
    }

    pub fn status(&self, id: Uuid) -> Result<Repository> {
        self.store
            .get_repository(id)?
            .ok_or(RunnerError::RepositoryNotFound(id))
    }

    /// All repositories, oldest first.
    pub fn all(&self) -> Result<Vec<Repository>> {
        let mut repos = self.store.list_repositories()?;
        repos.sort_by_key(|r| r.created_at);
        Ok(repos)
    }

    /// Mark records still `Cloning` from a previous process as `Failed`.
    ///
    /// Their clone died with the old server, so the checkout may be missing
    /// or partial. Returns how many records were changed.
    pub fn recover(&self) -> Result<usize> {
        let mut interrupted = 0;

        for mut repo in self.all()? {
            if repo.clone_status != CloneStatus::Cloning {
                continue;
            }
            repo.clone_status = CloneStatus::Failed;
            repo.clone_error = Some("interrupted by server restart".to_string());
            self.store.update_repository(&repo)?;
            tracing::warn!(repo_id = %repo.id, url = %repo.url, "Repository clone interrupted by restart");
            interrupted += 1;
        }

        Ok(interrupted)
    }
}
