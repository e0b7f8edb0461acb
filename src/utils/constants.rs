/// Managed deployment constants and defaults
///
/// Values here are the shipped defaults; every one of them can be
/// overridden through `AppConfig`.

/// Placeholder password shipped in the sample docker-compose.yml.
/// Backups and restores are refused while it is still in use.
pub const PLACEHOLDER_CREDENTIAL: &str = "YOUR_VERY_STRONG_PASSWORD_HERE";

pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_SERVICE: &str = "mongo";
pub const DEFAULT_CONTAINER_NAME: &str = "mongo";

pub const DEFAULT_DB_USERNAME: &str = "root";
pub const DEFAULT_AUTH_DATABASE: &str = "admin";
pub const DEFAULT_DB_PORT: u16 = 27017;
pub const DEFAULT_DB_PROTOCOL: &str = "tcp";

pub const DEFAULT_CONTAINER_STAGING_DIR: &str = "/tmp";
pub const DEFAULT_COMMAND_TIMEOUT: &str = "10m";
pub const DEFAULT_LOGS_TAIL: usize = 50;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024 * 1024;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Name offered to the browser for a downloaded backup
pub const BACKUP_DOWNLOAD_NAME: &str = "mongo_backup.gz";
pub const BACKUP_CONTENT_TYPE: &str = "application/gzip";

/// Multipart field carrying the archive on `POST /restore`
pub const RESTORE_FIELD: &str = "backupFile";

/// Used when an uploaded filename sanitizes down to nothing
pub const FALLBACK_UPLOAD_NAME: &str = "upload.gz";

/// Environment overrides
pub const ENV_PROJECT_ROOT: &str = "MONGO_CONSOLE_PROJECT_ROOT";
pub const ENV_DB_PASSWORD: &str = "MONGO_CONSOLE_DB_PASSWORD";
pub const ENV_API_TOKEN: &str = "MONGO_CONSOLE_TOKEN";
pub const ENV_CONTAINER: &str = "MONGO_CONSOLE_CONTAINER";
