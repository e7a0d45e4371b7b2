//! Local filesystem storage backend.
//!
//! This module provides an upload target on the local filesystem. Files are
//! stored beneath a configured directory and written via `tokio::fs` in
//! fixed-size chunks so progress can be reported while the bytes land.

use crate::backend::{ProgressFn, percent};
use crate::error::{ErrorKind, Result};
use crate::models::{Receipt, UploadOptions};
use crate::path::{to_key, validate as validate_path};
use crate::StorageBackend;
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Size of each write (and therefore the granularity of progress events).
const CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem storage backend.
///
/// Stores files in a directory on the local filesystem. All paths are relative
/// to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use hoist_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/uploads")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory uploads are written beneath
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the upload root directory
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn url(&self, relative: &Path) -> String {
        format!("file://{}/{}", self.root.display().to_string().trim_end_matches('/'), to_key(relative))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(
        &self,
        path: &Path,
        data: &[u8],
        options: &UploadOptions,
        on_progress: ProgressFn<'_>,
    ) -> Result<Receipt> {
        let relative = validate_path(path)?;
        let abs_path = self.root.join(&relative);
        // Create parent directories if needed, to keep behaviour
        // consistent with S3-compatible storage.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let mut file = fs::File::create(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        on_progress(percent(0, data.len()));
        let mut written = 0;
        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await.map_err(|e| Self::map_io_error(e, path))?;
            written += chunk.len();
            on_progress(percent(written, data.len()));
        }
        file.flush().await.map_err(|e| Self::map_io_error(e, path))?;
        tracing::debug!(target = %self.name, path = %relative.display(), bytes = data.len(), "Stored file");
        Ok(Receipt::new(&relative, self.url(&relative), data, options))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/uploads");
        LocalBackend::new("name", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_absolute_path() {
        let (temp_dir, backend) = backend();
        let expected = temp_dir.path().join("photos/beach.jpg");
        assert_eq!(backend.absolute_path(Path::new("photos/beach.jpg")).unwrap(), expected);
        assert!(backend.absolute_path(Path::new("../etc/passwd")).is_err());
    }

    #[tokio::test]
    async fn test_upload_and_read() {
        let (_temp_dir, backend) = backend();
        let options = UploadOptions::default().with_content_type("text/plain");
        let receipt = backend.upload(Path::new("notes/todo.txt"), b"buy milk", &options, &|_| {}).await.unwrap();
        assert_eq!(receipt.path, Path::new("notes/todo.txt"));
        assert_eq!(receipt.size, 8);
        assert!(receipt.url.starts_with("file://"));
        assert!(receipt.url.ends_with("/notes/todo.txt"));
        assert_eq!(backend.read(Path::new("notes/todo.txt")).await.unwrap(), b"buy milk");
    }

    #[tokio::test]
    async fn test_upload_reports_chunked_progress() {
        let (_temp_dir, backend) = backend();
        let data = vec![7u8; CHUNK_SIZE * 4];
        let seen = Mutex::new(Vec::new());
        backend
            .upload(Path::new("photos/big.raw"), &data, &UploadOptions::default(), &|p| seen.lock().unwrap().push(p))
            .await
            .unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[tokio::test]
    async fn test_upload_empty_file_completes() {
        let (_temp_dir, backend) = backend();
        let seen = Mutex::new(Vec::new());
        backend
            .upload(Path::new("photos/empty"), b"", &UploadOptions::default(), &|p| seen.lock().unwrap().push(p))
            .await
            .unwrap();
        assert_eq!(seen.into_inner().unwrap().last(), Some(&100.0));
        assert!(backend.exists(Path::new("photos/empty")).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let (_temp_dir, backend) = backend();
        let options = UploadOptions::default();
        backend.upload(Path::new("a.txt"), b"first", &options, &|_| {}).await.unwrap();
        backend.upload(Path::new("a.txt"), b"second", &options, &|_| {}).await.unwrap();
        assert_eq!(backend.read(Path::new("a.txt")).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_exists() {
        let (_temp_dir, backend) = backend();
        assert!(!backend.exists(Path::new("nonexistent.txt")).await.unwrap());
        backend.upload(Path::new("exists.txt"), b"data", &UploadOptions::default(), &|_| {}).await.unwrap();
        assert!(backend.exists(Path::new("exists.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let (_temp_dir, backend) = backend();
        let err = backend.read(Path::new("missing.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = backend();
        let options = UploadOptions::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.upload(Path::new("../etc/passwd"), b"data", &options, &|_| {}).await.is_err());
        assert!(backend.upload(Path::new("photos/../../x"), b"data", &options, &|_| {}).await.is_err());
    }
}
