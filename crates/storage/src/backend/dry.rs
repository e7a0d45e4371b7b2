//! Dry-run storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and prevents uploads from executing, but indicating
//! success on return.

use async_trait::async_trait;
use std::path::Path;

use crate::backend::ProgressFn;
use crate::error::Result;
use crate::models::{Receipt, UploadOptions};
use crate::path::{to_key, validate as validate_path};
use crate::{BackendHandle, StorageBackend};

/// Dry-run storage backend.
///
/// Wraps another backend and silently drops all uploads, logging an
/// [`info event`](tracing::Event) and handing back a receipt with a
/// `dry-run://` URL. Reads are passed through to the wrapped backend.
#[derive(Clone)]
pub struct DryRunBackend {
    inner: BackendHandle,
}
impl DryRunBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for DryRunBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn upload(
        &self,
        path: &Path,
        data: &[u8],
        options: &UploadOptions,
        on_progress: ProgressFn<'_>,
    ) -> Result<Receipt> {
        let path = validate_path(path)?;
        tracing::info!(path = %path.display(), bytes = data.len(), "Skipping upload during dry run");
        on_progress(100.0);
        let url = format!("dry-run://{}/{}", self.inner.name(), to_key(&path));
        Ok(Receipt::new(&path, url, data, options))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }
}
