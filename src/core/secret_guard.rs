/// Placeholder credential detection
///
/// Policy: an operation is unsafe when the placeholder appears anywhere in
/// the compose file, or when the console's own configured password is the
/// placeholder. The same check runs at startup (warning only) and before
/// every backup and restore (blocking).

use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::utils::PLACEHOLDER_CREDENTIAL;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    #[error("{file} not found.")]
    ConfigNotFound { path: PathBuf, file: String },

    #[error("Failed to read {}: {reason}", .path.display())]
    ConfigUnreadable { path: PathBuf, reason: String },

    #[error("SECURITY RISK: Please change the default password in your {file} file first.")]
    PlaceholderInConfig { file: String },

    #[error("SECURITY RISK: The console database password is still the default. Set MONGO_CONSOLE_DB_PASSWORD or db_password in the config.")]
    PlaceholderCredential,

    #[error("{file} is not valid compose YAML: {reason}")]
    ConfigInvalid { file: String, reason: String },

    #[error("Service '{service}' is not defined in {file}.")]
    ServiceNotDefined { service: String, file: String },
}

impl GuardViolation {
    /// Unsafe credentials are the operator's to fix (client error);
    /// missing or broken configuration is a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GuardViolation::PlaceholderInConfig { .. } | GuardViolation::PlaceholderCredential
        )
    }
}

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone)]
pub struct SecretGuard {
    compose_path: PathBuf,
    service: String,
    credential: String,
}

impl SecretGuard {
    pub fn new(compose_path: impl Into<PathBuf>, service: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            compose_path: compose_path.into(),
            service: service.into(),
            credential: credential.into(),
        }
    }

    pub fn compose_path(&self) -> &Path {
        &self.compose_path
    }

    fn file_label(&self) -> String {
        self.compose_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.compose_path.display().to_string())
    }

    /// Fails closed: any problem reading the configuration is a violation
    pub async fn check(&self) -> Result<(), GuardViolation> {
        let content = match tokio::fs::read_to_string(&self.compose_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GuardViolation::ConfigNotFound {
                    path: self.compose_path.clone(),
                    file: self.file_label(),
                });
            }
            Err(e) => {
                return Err(GuardViolation::ConfigUnreadable {
                    path: self.compose_path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        if content.contains(PLACEHOLDER_CREDENTIAL) {
            return Err(GuardViolation::PlaceholderInConfig {
                file: self.file_label(),
            });
        }

        if self.credential == PLACEHOLDER_CREDENTIAL {
            return Err(GuardViolation::PlaceholderCredential);
        }

        let compose: ComposeFile =
            serde_yaml::from_str(&content).map_err(|e| GuardViolation::ConfigInvalid {
                file: self.file_label(),
                reason: e.to_string(),
            })?;

        if !compose.services.contains_key(&self.service) {
            return Err(GuardViolation::ServiceNotDefined {
                service: self.service.clone(),
                file: self.file_label(),
            });
        }

        Ok(())
    }

    pub async fn is_credential_safe(&self) -> bool {
        self.check().await.is_ok()
    }

    /// Startup variant: reports, never blocks
    pub async fn warn_if_unsafe(&self) -> bool {
        match self.check().await {
            Ok(()) => true,
            Err(GuardViolation::ConfigNotFound { path, .. }) => {
                warn!(
                    path = %path.display(),
                    "compose file not found, cannot check for the default password"
                );
                false
            }
            Err(violation) => {
                warn!("{}", violation);
                warn!("Backups and restores stay disabled until this is fixed.");
                false
            }
        }
    }
}
