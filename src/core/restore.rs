/// Restore: stage the upload, copy it into the container, mongorestore, clean both sides
///
/// `mongorestore --drop` replaces existing data, so it only runs after the
/// copy into the container succeeded. The host staging file is owned by a
/// `StagedFile` and removed on every path; the in-container copy is removed
/// best-effort once it exists.

use std::path::Path;
use tracing::{info, warn};

use super::console::Console;
use super::error::ConsoleError;
use super::executor::OperationResult;
use super::staging::StagedFile;

impl Console {
    /// Reserve a unique host staging path for an upload named `file_name`.
    /// Only the sanitized basename of `file_name` is used.
    pub fn stage_upload(&self, file_name: &str) -> Result<StagedFile, ConsoleError> {
        if file_name.trim().is_empty() {
            return Err(ConsoleError::validation("No file selected."));
        }
        self.ensure_staging_dir()?;
        Ok(StagedFile::reserve(self.staging_dir(), "restore", file_name))
    }

    /// Stage a local archive (CLI path) the same way an upload is staged
    pub async fn stage_local_file(&self, source: &Path) -> Result<StagedFile, ConsoleError> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staged = self.stage_upload(&name)?;
        tokio::fs::copy(source, staged.path()).await?;
        Ok(staged)
    }

    pub async fn restore(&self, upload: StagedFile) -> Result<OperationResult, ConsoleError> {
        self.guard().check().await?;

        if !upload.exists() {
            return Err(ConsoleError::validation("Uploaded backup file is missing."));
        }

        let _lock = self.exclusive().await;

        let container_path = self.container_path(upload.file_name());
        info!(
            service = %self.compose().service(),
            host = %upload.path().display(),
            container = %container_path,
            "copying backup into container"
        );

        let copy = self
            .runner()
            .run(self.compose().copy_into(upload.path(), &container_path))
            .await;
        if !copy.success {
            warn!(error = %copy.error.trim(), "copy into container failed, restore not attempted");
            return Ok(copy.for_step("Copy into container"));
        }

        info!(container = %container_path, "running mongorestore");
        let restore_cmd = self
            .compose()
            .exec(["mongorestore".to_string()])
            .args(self.auth().flags())
            .arg(format!("--archive={}", container_path))
            .args(["--gzip", "--drop"])
            .secret(self.auth().password.clone())
            .capture();
        let result = self.runner().run(restore_cmd).await;

        let cleanup = self
            .runner()
            .run(self.compose().remove_in_container(&container_path))
            .await;
        if !cleanup.success {
            warn!(container = %container_path, error = %cleanup.error.trim(), "failed to remove in-container staging file");
        }

        drop(upload);

        if result.success {
            info!("restore completed");
        } else {
            warn!(error = %result.error.trim(), "mongorestore failed");
        }
        Ok(result.for_step("mongorestore"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::console::tests::{console_with, safe_config, staged_entries};
    use crate::core::executor::{ExternalCommand, MockCommandRunner};
    use crate::utils::PLACEHOLDER_CREDENTIAL;
    use mockall::Sequence;

    fn is_copy(cmd: &ExternalCommand) -> bool {
        cmd.has_arg("cp")
    }

    fn is_restore(cmd: &ExternalCommand) -> bool {
        cmd.has_arg("mongorestore")
    }

    fn is_cleanup(cmd: &ExternalCommand) -> bool {
        cmd.has_arg("rm")
    }

    fn staged_upload(console: &Console, name: &str) -> StagedFile {
        let staged = console.stage_upload(name).unwrap();
        std::fs::write(staged.path(), b"gzip-archive").unwrap();
        staged
    }

    #[test]
    fn test_empty_filename_rejected() {
        let (_dir, config) = safe_config();
        let console = console_with(&config, MockCommandRunner::new());
        let err = console.stage_upload("  ").unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "No file selected.");
    }

    #[test]
    fn test_traversal_name_is_staged_inside_staging_dir() {
        let (_dir, config) = safe_config();
        let console = console_with(&config, MockCommandRunner::new());
        let staged = console.stage_upload("../../etc/passwot").unwrap();
        assert_eq!(staged.path().parent(), Some(config.staging_dir().as_path()));
        assert_eq!(
            console.container_path(staged.file_name()),
            format!("/tmp/{}", staged.file_name())
        );
    }

    #[tokio::test]
    async fn test_successful_restore_sequence() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        runner
            .expect_run()
            .withf(is_copy)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| OperationResult::success(""));
        runner
            .expect_run()
            .withf(|cmd| is_restore(cmd) && cmd.has_arg("--drop") && cmd.has_arg("--gzip"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| OperationResult::success("finished restoring"));
        runner
            .expect_run()
            .withf(is_cleanup)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| OperationResult::success(""));

        let console = console_with(&config, runner);
        let upload = staged_upload(&console, "mongo_backup.gz");
        let result = console.restore(upload).await.unwrap();

        assert!(result.success);
        assert_eq!(result.output, "finished restoring");
        assert_eq!(staged_entries(&config), 0);
    }

    #[tokio::test]
    async fn test_copy_failure_skips_restore() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(is_copy)
            .times(1)
            .returning(|_| OperationResult::failure("no such service: mongo"));
        runner.expect_run().withf(is_restore).never();
        runner.expect_run().withf(is_cleanup).never();

        let console = console_with(&config, runner);
        let upload = staged_upload(&console, "mongo_backup.gz");
        let result = console.restore(upload).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.error, "Copy into container failed: no such service: mongo");
        assert_eq!(staged_entries(&config), 0);
    }

    #[tokio::test]
    async fn test_restore_failure_cleans_both_sides() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(is_copy)
            .returning(|_| OperationResult::success(""));
        runner
            .expect_run()
            .withf(is_restore)
            .returning(|_| OperationResult::failure("archive is corrupt"));
        runner
            .expect_run()
            .withf(|cmd| is_cleanup(cmd) && cmd.args.iter().any(|a| a.starts_with("/tmp/restore-")))
            .times(1)
            .returning(|_| OperationResult::success(""));

        let console = console_with(&config, runner);
        let upload = staged_upload(&console, "../../etc/passwot");
        let result = console.restore(upload).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.error, "mongorestore failed: archive is corrupt");
        assert_eq!(staged_entries(&config), 0);
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_mask_result() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| is_copy(cmd) || is_restore(cmd))
            .times(2)
            .returning(|_| OperationResult::success("ok"));
        runner
            .expect_run()
            .withf(is_cleanup)
            .returning(|_| OperationResult::failure("container stopped"));

        let console = console_with(&config, runner);
        let upload = staged_upload(&console, "mongo_backup.gz");
        assert!(console.restore(upload).await.unwrap().success);
        assert_eq!(staged_entries(&config), 0);
    }

    #[tokio::test]
    async fn test_placeholder_blocks_restore() {
        let (dir, config) = safe_config();
        std::fs::write(
            dir.path().join("docker-compose.yml"),
            format!("services:\n  mongo:\n    environment:\n      PW: {}\n", PLACEHOLDER_CREDENTIAL),
        )
        .unwrap();

        let console = console_with(&config, MockCommandRunner::new());
        let upload = staged_upload(&console, "mongo_backup.gz");
        let err = console.restore(upload).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Precondition(_)));
        assert_eq!(staged_entries(&config), 0);
    }

    #[tokio::test]
    async fn test_stage_local_file() {
        let (dir, config) = safe_config();
        let source = dir.path().join("nightly.gz");
        std::fs::write(&source, b"archive").unwrap();

        let console = console_with(&config, MockCommandRunner::new());
        let staged = console.stage_local_file(&source).await.unwrap();
        assert!(staged.file_name().ends_with("-nightly.gz"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"archive");
        assert!(source.exists());
    }
}
