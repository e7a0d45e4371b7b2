//! Upload transport trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for putting files into a storage target (local filesystem,
//! S3-compatible services, etc.) while reporting byte-level progress.

mod dry;
mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::dry::DryRunBackend;
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::{Receipt, UploadOptions};
use async_trait::async_trait;
use std::path::Path;

/// Callback receiving upload progress as a percentage in `0.0..=100.0`.
///
/// Within a single upload the reported values never decrease.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Unified interface for upload transports.
///
/// All operations are asynchronous; many uploads are expected to be in
/// flight against the same backend at once, so implementations must be
/// usable through a shared reference.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use hoist_storage::{StorageBackend, UploadOptions, error::Result};
///
/// async fn upload_note(backend: &dyn StorageBackend) -> Result<String> {
///     let options = UploadOptions::default().with_content_type("text/plain");
///     let receipt = backend
///         .upload(Path::new("notes/todo.txt"), b"buy milk", &options, &|percent| {
///             println!("{percent:.0}%");
///         })
///         .await?;
///     Ok(receipt.url)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Upload `data` to `path`, overwriting anything already there.
    ///
    /// `on_progress` is called zero or more times with monotonically
    /// increasing percentages; a successful upload always ends with `100.0`.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    /// - Retries and timeouts are the transport's business, not the caller's.
    async fn upload(
        &self,
        path: &Path,
        data: &[u8],
        options: &UploadOptions,
        on_progress: ProgressFn<'_>,
    ) -> Result<Receipt>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Percentage of `total` represented by `done`, clamped to `0.0..=100.0`.
///
/// An empty payload is complete as soon as it starts.
pub(crate) fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::percent;

    #[test]
    fn percent_of_payload() {
        assert_eq!(percent(0, 200), 0.0);
        assert_eq!(percent(50, 200), 25.0);
        assert_eq!(percent(200, 200), 100.0);
        assert_eq!(percent(0, 0), 100.0);
    }
}
