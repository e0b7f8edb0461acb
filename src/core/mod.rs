pub mod executor;
pub mod secret_guard;
pub mod staging;
pub mod error;
pub mod console;
pub mod docker;
pub mod backup;
pub mod restore;
pub mod firewall;

pub use backup::BackupArchive;
pub use console::Console;
pub use docker::{ServiceState, StatusReport};
pub use error::ConsoleError;
pub use executor::{CommandRunner, Executor, ExternalCommand, OperationResult};
pub use secret_guard::{GuardViolation, SecretGuard};
pub use staging::StagedFile;
