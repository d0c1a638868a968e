use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::gateway::{run_gateway, GatewayState};
use crate::repo::{GitCli, RepositoryManager};
use crate::runner::{CommandExecutor, JobRunner};
use crate::store::{DiskStore, RecordStore};

/// Wires the record store, job runner and repository manager behind the
/// HTTP gateway.
pub struct Server {
    pub config: ServerConfig,
    pub jobs: JobRunner,
    pub repos: RepositoryManager,
}

impl Server {
    /// Open the record database under the configured db root.
    pub fn open(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = DiskStore::open(config.database_path())?;
        tracing::info!(path = %store.path().display(), "Record store ready");
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn RecordStore>) -> Self {
        let jobs = JobRunner::new(store.clone(), CommandExecutor::new(config.shell.clone()));
        let repos = RepositoryManager::new(store, GitCli::default(), config.build_root.clone());

        Self {
            config,
            jobs,
            repos,
        }
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            jobs: self.jobs.clone(),
            repos: self.repos.clone(),
            default_remote: self.config.default_remote.clone(),
        }
    }

    /// Recover leftover tasks and clones, then serve requests until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or the gateway fails to bind.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
        let report = self.jobs.recover()?;
        if report.relaunched > 0 || report.interrupted > 0 {
            tracing::info!(
                relaunched = report.relaunched,
                interrupted = report.interrupted,
                "Recovered tasks from previous run"
            );
        }

        let interrupted = self.repos.recover()?;
        if interrupted > 0 {
            tracing::info!(interrupted, "Recovered repositories from previous run");
        }

        run_gateway(self.config.listen_addr, self.gateway_state(), shutdown).await?;
        tracing::info!("Gateway stopped");
        Ok(())
    }
}
