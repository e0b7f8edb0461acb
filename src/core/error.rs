use thiserror::Error;

use super::executor::OperationResult;
use super::secret_guard::GuardViolation;

/// Failures that stop an operation before or between external steps.
///
/// Failed external commands that an operation reports as its outcome
/// (deploy, logs, restore, add-rule) are `Ok(OperationResult)`, not errors.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Bad or missing request input; nothing was attempted
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Precondition(#[from] GuardViolation),

    /// Upload body over the configured limit; nothing was staged
    #[error("Backup file exceeds the upload limit of {limit} bytes.")]
    UploadTooLarge { limit: usize },

    /// A step whose failure leaves nothing to hand back, e.g. the dump
    #[error("{}", .0.error)]
    Command(OperationResult),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConsoleError::Validation(message.into())
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            ConsoleError::Validation(_) | ConsoleError::UploadTooLarge { .. } => true,
            ConsoleError::Precondition(violation) => violation.is_client_error(),
            ConsoleError::Command(_) | ConsoleError::Io(_) => false,
        }
    }

    /// The structured result shown to callers
    pub fn to_result(&self) -> OperationResult {
        match self {
            ConsoleError::Command(result) => result.clone(),
            other => OperationResult::failure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_upload_is_client_error() {
        let err = ConsoleError::UploadTooLarge { limit: 16 };
        assert!(err.is_client_error());
        assert_eq!(
            err.to_result(),
            OperationResult::failure("Backup file exceeds the upload limit of 16 bytes.")
        );
    }

    #[test]
    fn test_command_error_keeps_step_result() {
        let failed = OperationResult::failure("Authentication failed.").for_step("mongodump");
        let err = ConsoleError::Command(failed.clone());
        assert!(!err.is_client_error());
        assert_eq!(err.to_result(), failed);
        assert_eq!(err.to_string(), "mongodump failed: Authentication failed.");
    }
}
