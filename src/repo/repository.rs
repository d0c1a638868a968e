use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RunnerError};
use crate::fingerprint::fingerprint;

/// Whether the on-disk checkout of a repository exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStatus {
    /// Record persisted, clone in progress.
    Cloning,
    /// Clone succeeded; the checkout can be pulled.
    Ready,
    /// Clone failed; `clone_error` says why.
    Failed,
}

impl std::fmt::Display for CloneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneStatus::Cloning => write!(f, "cloning"),
            CloneStatus::Ready => write!(f, "ready"),
            CloneStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: Uuid,
    pub directory: PathBuf,
    pub url: String,
    pub remote_name: String,
    pub clone_status: CloneStatus,
    pub clone_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(build_root: &Path, url: String, remote_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            directory: checkout_dir(build_root, &url),
            url,
            remote_name,
            clone_status: CloneStatus::Cloning,
            clone_error: None,
            created_at: Utc::now(),
        }
    }
}

/// Accept remote names made of `[A-Za-z0-9._-]` that do not start with `-`
/// or `.`. The name ends up as a git argument, so anything git could read as
/// an option is rejected.
pub fn validate_remote_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with(['-', '.'])
        && !name.ends_with(".lock")
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(RunnerError::Validation(format!(
            "invalid remote name {:?}",
            name
        )))
    }
}

/// `<build_root>/<fingerprint(url)>`
pub fn checkout_dir(build_root: &Path, url: &str) -> PathBuf {
    build_root.join(fingerprint(url))
}
