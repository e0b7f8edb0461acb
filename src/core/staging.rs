/// Request-scoped staging files
///
/// A `StagedFile` owns a unique path inside the staging directory and
/// removes the file when dropped, so a staged archive cannot outlive the
/// operation that created it, whichever way that operation ends.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::utils::{generate_hex_string, sanitize_filename};

const UNIQUE_SUFFIX_LEN: usize = 16;

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file_name: String,
}

impl StagedFile {
    /// Reserve `<dir>/<prefix>-<random>-<sanitized name>`. Nothing is created yet.
    pub fn reserve(dir: &Path, prefix: &str, name: &str) -> Self {
        let file_name = format!(
            "{}-{}-{}",
            prefix,
            generate_hex_string(UNIQUE_SUFFIX_LEN),
            sanitize_filename(name)
        );
        let path = dir.join(&file_name);
        debug!(path = %path.display(), "reserved staging path");
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Single path component, safe to reuse for the in-container copy
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed staging file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove staging file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedFile::reserve(dir.path(), "restore", "backup.gz");
        let b = StagedFile::reserve(dir.path(), "restore", "backup.gz");
        assert_ne!(a.path(), b.path());
        assert!(a.file_name().ends_with("-backup.gz"));
    }

    #[test]
    fn test_traversal_name_stays_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::reserve(dir.path(), "restore", "../../etc/passwot");
        assert_eq!(staged.path().parent(), Some(dir.path()));
        assert!(staged.file_name().ends_with("-passwot"));
        assert!(!staged.file_name().contains('/'));
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::reserve(dir.path(), "backup", "mongo_backup.gz");
        std::fs::write(staged.path(), b"data").unwrap();
        let path = staged.path().to_path_buf();
        assert!(staged.exists());
        assert_eq!(staged.len().unwrap(), 4);

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_without_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::reserve(dir.path(), "backup", "mongo_backup.gz");
        assert!(!staged.exists());
        drop(staged);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
