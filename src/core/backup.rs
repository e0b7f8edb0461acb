/// Backup: dump, stage on disk, hand to the caller, clean up
///
/// The dump runs inside the managed container with its stdout redirected
/// to a unique host staging file. The returned `BackupArchive` owns that
/// file; it is removed once the archive is persisted, fully streamed, or
/// dropped part-way (client disconnect, read error).

use futures::stream::{self, Stream};
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use super::console::Console;
use super::error::ConsoleError;
use super::executor::OperationResult;
use super::staging::StagedFile;
use crate::utils::BACKUP_DOWNLOAD_NAME;

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct BackupArchive {
    staged: StagedFile,
    size: u64,
}

impl BackupArchive {
    pub fn path(&self) -> &Path {
        self.staged.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Chunked reader over the archive; the staging file goes away with the stream
    pub async fn into_stream(
        self,
    ) -> io::Result<impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static> {
        let file = tokio::fs::File::open(self.staged.path()).await?;

        Ok(stream::try_unfold((file, self), |(mut file, archive)| async move {
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);
            Ok(Some((buf, (file, archive))))
        }))
    }

    /// Copy the archive to `dest`, then release the staging file
    pub async fn persist_to(self, dest: &Path) -> io::Result<u64> {
        tokio::fs::copy(self.staged.path(), dest).await
    }
}

impl Console {
    pub async fn backup(&self) -> Result<BackupArchive, ConsoleError> {
        self.guard().check().await?;

        let _lock = self.exclusive().await;
        self.ensure_staging_dir()?;

        let staged = StagedFile::reserve(self.staging_dir(), "backup", BACKUP_DOWNLOAD_NAME);
        info!(service = %self.compose().service(), path = %staged.path().display(), "dumping database");

        let dump = self
            .compose()
            .exec(["mongodump".to_string()])
            .args(self.auth().flags())
            .args(["--archive", "--gzip"])
            .secret(self.auth().password.clone())
            .stdout_to(staged.path());

        let result = self.runner().run(dump).await;
        if !result.success {
            warn!(error = %result.error.trim(), "mongodump failed");
            return Err(ConsoleError::Command(result.for_step("mongodump")));
        }

        if !staged.exists() {
            return Err(ConsoleError::Command(OperationResult::failure(
                "mongodump reported success but no archive was produced",
            )));
        }

        let size = staged.len()?;
        if size == 0 {
            return Err(ConsoleError::Command(OperationResult::failure(
                "mongodump produced an empty archive",
            )));
        }

        info!(bytes = size, "backup archive ready");
        Ok(BackupArchive { staged, size })
    }
}
