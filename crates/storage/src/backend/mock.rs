//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::backend::ProgressFn;
use crate::error::{ErrorKind, Result};
use crate::models::{Receipt, UploadOptions};
use crate::path::{to_key, validate as validate_path};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Failures, panics
/// and latency can be injected per destination path to exercise the
/// orchestration around the transport.
///
/// # Examples
///
/// ```
/// use hoist_storage::backend::MockBackend;
/// use hoist_storage::{StorageBackend, UploadOptions};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default().fail_on("photos/broken.jpg");
/// let options = UploadOptions::default();
///
/// backend.upload(Path::new("photos/ok.jpg"), b"data...", &options, &|_| {}).await?;
/// assert!(backend.exists(Path::new("photos/ok.jpg")).await?);
/// assert!(backend.upload(Path::new("photos/broken.jpg"), b"data...", &options, &|_| {}).await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    failures: HashSet<PathBuf>,
    panics: HashSet<PathBuf>,
    latency: HashMap<PathBuf, Duration>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let storage = files.into_iter().map(|(path, data)| (Self::checked(path), data.into())).collect();
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(storage),
            failures: HashSet::new(),
            panics: HashSet::new(),
            latency: HashMap::new(),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uploads to `path` fail with a [`Network`](ErrorKind::Network) error
    /// after reporting partial progress.
    pub fn fail_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.failures.insert(Self::checked(path));
        self
    }

    /// Uploads to `path` panic, simulating a defect inside the transport.
    pub fn panic_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.panics.insert(Self::checked(path));
        self
    }

    /// Uploads to `path` sleep for `delay` before completing.
    pub fn with_latency(mut self, path: impl Into<PathBuf>, delay: Duration) -> Self {
        self.latency.insert(Self::checked(path), delay);
        self
    }

    /// Snapshot of every stored path, sorted.
    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.storage.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn checked(path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        let Ok(validated) = validate_path(&path) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
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
        let path = validate_path(path)?;
        on_progress(0.0);
        tokio::task::yield_now().await;
        if let Some(delay) = self.latency.get(&path) {
            tokio::time::sleep(*delay).await;
        }
        on_progress(50.0);
        if self.panics.contains(&path) {
            panic!("MockBackend: simulated transport defect for {}", path.display());
        }
        if self.failures.contains(&path) {
            exn::bail!(ErrorKind::Network(format!("simulated failure uploading {}", path.display())));
        }
        self.storage.write().await.insert(path.clone(), data.to_vec());
        on_progress(100.0);
        let url = format!("mock://{}/{}", self.name, to_key(&path));
        Ok(Receipt::new(&path, url, data, options))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let data = self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_upload_and_read() {
        let backend = MockBackend::default();
        let receipt = backend.upload(Path::new("test.txt"), b"hello", &UploadOptions::default(), &|_| {}).await.unwrap();
        assert_eq!(receipt.url, "mock://mock/test.txt");
        assert_eq!(backend.read(Path::new("test.txt")).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_with_files() {
        let backend = MockBackend::with_files([("photos/a.jpg", Vec::from(*b"a")), ("photos/b.jpg", Vec::from(*b"b"))])
            .with_name("bucket");
        assert_eq!(backend.name(), "bucket");
        assert!(backend.exists(Path::new("photos/a.jpg")).await.unwrap());
        assert!(!backend.exists(Path::new("photos/c.jpg")).await.unwrap());
        assert_eq!(backend.paths().await, vec![PathBuf::from("photos/a.jpg"), PathBuf::from("photos/b.jpg")]);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_progress_sequence() {
        let backend = MockBackend::default();
        let seen = Mutex::new(Vec::new());
        backend
            .upload(Path::new("a.txt"), b"abc", &UploadOptions::default(), &|p| seen.lock().unwrap().push(p))
            .await
            .unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![0.0, 50.0, 100.0]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MockBackend::default().fail_on("photos/b.jpg");
        let err = backend.upload(Path::new("photos/b.jpg"), b"b", &UploadOptions::default(), &|_| {}).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(!backend.exists(Path::new("photos/b.jpg")).await.unwrap());
    }

    #[tokio::test]
    #[should_panic(expected = "simulated transport defect")]
    async fn test_injected_panic() {
        let backend = MockBackend::default().panic_on("photos/b.jpg");
        let _ = backend.upload(Path::new("photos/b.jpg"), b"b", &UploadOptions::default(), &|_| {}).await;
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.upload(Path::new("../escape"), b"bad", &UploadOptions::default(), &|_| {}).await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
