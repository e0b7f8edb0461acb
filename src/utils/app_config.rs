/// Application configuration management
/// Stores console settings in ~/.config/mongo-console/config.toml

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding docker-compose.yml; commands run here
    pub project_root: Option<PathBuf>,
    pub compose_file: PathBuf,
    /// Compose service name of the managed database
    pub service: String,
    /// Runtime container name, used for status inspection
    pub container_name: String,
    pub db_username: String,
    pub auth_database: String,
    pub db_password: Option<String>,
    pub db_port: u16,
    pub db_protocol: String,
    pub staging_dir: Option<PathBuf>,
    pub container_staging_dir: String,
    /// humantime syntax, e.g. "90s" or "10m"
    pub command_timeout: String,
    pub logs_tail: usize,
    pub max_upload_bytes: u64,
    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            compose_file: PathBuf::from(DEFAULT_COMPOSE_FILE),
            service: DEFAULT_SERVICE.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            db_username: DEFAULT_DB_USERNAME.to_string(),
            auth_database: DEFAULT_AUTH_DATABASE.to_string(),
            db_password: None,
            db_port: DEFAULT_DB_PORT,
            db_protocol: DEFAULT_DB_PROTOCOL.to_string(),
            staging_dir: None,
            container_staging_dir: DEFAULT_CONTAINER_STAGING_DIR.to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT.to_string(),
            logs_tail: DEFAULT_LOGS_TAIL,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            api_token: None,
        }
    }
}

impl AppConfig {
    /// Get default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join("mongo-console");
        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from an explicit file, or the default location.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !path.exists() {
            if required {
                return Err(anyhow!("Config file not found at {}", path.display()));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MONGO_CONSOLE_*` environment variables on top of file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(ENV_PROJECT_ROOT) {
            self.project_root = Some(PathBuf::from(root));
        }
        if let Some(password) = get(ENV_DB_PASSWORD) {
            self.db_password = Some(password);
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(container) = get(ENV_CONTAINER) {
            self.container_name = container;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.timeout()?;
        if self.service.trim().is_empty() {
            return Err(anyhow!("service must not be empty"));
        }
        if self.logs_tail == 0 {
            return Err(anyhow!("logs_tail must be at least 1"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.command_timeout)
            .with_context(|| format!("Invalid command_timeout '{}'", self.command_timeout))
    }

    /// Project root, defaulting to the current directory
    pub fn project_root(&self) -> Result<PathBuf> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to get current directory"),
        }
    }

    pub fn compose_path(&self) -> Result<PathBuf> {
        Ok(self.project_root()?.join(&self.compose_file))
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Configured database password; an unset password counts as the placeholder
    pub fn credential(&self) -> &str {
        self.db_password.as_deref().unwrap_or(PLACEHOLDER_CREDENTIAL)
    }

    /// Describes the credential without revealing any of it
    pub fn credential_state(&self) -> &'static str {
        match self.db_password.as_deref() {
            None => "unset (placeholder)",
            Some(PLACEHOLDER_CREDENTIAL) => "placeholder",
            Some(_) => "set",
        }
    }

    /// Upload limit for the HTTP layer, saturating on narrow targets
    pub fn upload_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}
