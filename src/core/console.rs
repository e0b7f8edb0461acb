/// The managed-service console
///
/// Binds one compose service, its credential and a staging area to the
/// command runner and container inspector. Deploy, backup and restore take
/// the operation lock so only one of them touches the service at a time;
/// status and logs never wait on it.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::docker::{ComposeProject, ContainerInspector, DockerInspector};
use super::executor::{CommandRunner, Executor};
use super::secret_guard::SecretGuard;
use crate::utils::AppConfig;

/// Credentials for the database client tools inside the container
#[derive(Clone)]
pub struct DatabaseAuth {
    pub username: String,
    pub password: String,
    pub auth_database: String,
}

impl DatabaseAuth {
    /// Common mongodump/mongorestore authentication flags
    pub fn flags(&self) -> Vec<String> {
        vec![
            format!("--username={}", self.username),
            format!("--password={}", self.password),
            format!("--authenticationDatabase={}", self.auth_database),
        ]
    }
}

impl std::fmt::Debug for DatabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseAuth")
            .field("username", &self.username)
            .field("password", &"****")
            .field("auth_database", &self.auth_database)
            .finish()
    }
}

pub struct Console {
    compose: ComposeProject,
    auth: DatabaseAuth,
    guard: SecretGuard,
    container_name: String,
    db_port: u16,
    db_protocol: String,
    staging_dir: PathBuf,
    container_staging_dir: String,
    logs_tail: usize,
    runner: Arc<dyn CommandRunner>,
    inspector: Arc<dyn ContainerInspector>,
    operation_lock: Mutex<()>,
}

impl Console {
    /// Console backed by real processes and the local Docker daemon
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.timeout()?;
        Self::with_backends(
            config,
            Arc::new(Executor::new(timeout)),
            Arc::new(DockerInspector::connect(timeout)),
        )
    }

    pub fn with_backends(
        config: &AppConfig,
        runner: Arc<dyn CommandRunner>,
        inspector: Arc<dyn ContainerInspector>,
    ) -> Result<Self> {
        config.validate()?;
        let project_root = config.project_root()?;
        let compose_path = config.compose_path()?;

        Ok(Self {
            compose: ComposeProject::new(&project_root, &config.compose_file, &config.service),
            auth: DatabaseAuth {
                username: config.db_username.clone(),
                password: config.credential().to_string(),
                auth_database: config.auth_database.clone(),
            },
            guard: SecretGuard::new(compose_path, &config.service, config.credential()),
            container_name: config.container_name.clone(),
            db_port: config.db_port,
            db_protocol: config.db_protocol.clone(),
            staging_dir: config.staging_dir(),
            container_staging_dir: config.container_staging_dir.clone(),
            logs_tail: config.logs_tail,
            runner,
            inspector,
            operation_lock: Mutex::new(()),
        })
    }

    pub fn guard(&self) -> &SecretGuard {
        &self.guard
    }

    pub fn compose(&self) -> &ComposeProject {
        &self.compose
    }

    pub fn auth(&self) -> &DatabaseAuth {
        &self.auth
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn db_port(&self) -> u16 {
        self.db_port
    }

    pub fn db_protocol(&self) -> &str {
        &self.db_protocol
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// In-container path mirroring a host staging file name
    pub fn container_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.container_staging_dir.trim_end_matches('/'), file_name)
    }

    pub fn logs_tail(&self) -> usize {
        self.logs_tail
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub(crate) fn inspector(&self) -> &dyn ContainerInspector {
        self.inspector.as_ref()
    }

    /// Serializes deploy, backup and restore
    pub(crate) async fn exclusive(&self) -> MutexGuard<'_, ()> {
        debug!("waiting for operation lock");
        self.operation_lock.lock().await
    }

    pub(crate) fn ensure_staging_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.staging_dir)
    }
}
