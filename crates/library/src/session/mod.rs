//! The lifecycle of one folder upload, from selection to completion.
//!
//! ```text
//! Idle ──select──▶ Selecting ──ok──▶ Ready ──submit──▶ Uploading ──▶ Idle
//!                      │                                  (success or error)
//!                      └──error──▶ (previous phase)
//! ```

use crate::collect::{Batch, DirectoryHandle, Entry, SelectedFile, collect_files, collect_tree};
use crate::error::{ErrorKind, Result};
use crate::guard::{self, DEFAULT_LIMIT_BYTES};
use crate::optimize::compress_all;
use crate::upload::{ProgressState, ProgressTracker, UploadResult, upload_all, upload_settled};
use derive_more::Display;
use futures::FutureExt;
use hoist_compress::ImageCompressor;
use hoist_storage::{BackendHandle, Receipt, UploadOptions};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Phase {
    #[display("idle")]
    Idle,
    #[display("selecting")]
    Selecting,
    #[display("ready")]
    Ready,
    #[display("uploading")]
    Uploading,
}

#[derive(Clone, Debug)]
pub struct Settings {
    /// Selections larger than this (before compression) are rejected.
    pub max_batch_bytes: u64,
    /// `None` uploads every file as selected.
    pub compressor: Option<ImageCompressor>,
    pub compression_timeout: Duration,
    pub upload_options: UploadOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_batch_bytes: DEFAULT_LIMIT_BYTES,
            compressor: Some(ImageCompressor::default()),
            compression_timeout: Duration::from_secs(60),
            upload_options: UploadOptions::default(),
        }
    }
}

/// One user's upload session.
pub struct Session {
    backend: BackendHandle,
    settings: Settings,
    phase: Phase,
    batch: Option<Batch>,
    /// Kept separately from the batch, which is handed off while uploading.
    folder_name: Option<String>,
    progress: ProgressState,
}

impl Session {
    pub fn new(backend: BackendHandle, settings: Settings) -> Self {
        Self {
            backend,
            settings,
            phase: Phase::Idle,
            batch: None,
            folder_name: None,
            progress: ProgressState::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The selected batch, while one is waiting to be submitted.
    pub fn batch(&self) -> Option<&Batch> {
        self.batch.as_ref()
    }

    pub fn folder_name(&self) -> Option<&str> {
        self.folder_name.as_deref()
    }

    /// Overall upload progress (0 to 100), updated as uploads report in.
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    pub fn progress_value(&self) -> f64 {
        self.progress.current()
    }

    /// Select a flat list of files, as handed over by a folder picker.
    ///
    /// On failure the session is left exactly as it was.
    pub fn select_files(&mut self, files: Vec<SelectedFile>, fallback_folder: &str) -> Result<&Batch> {
        let previous = self.begin_selection()?;
        let selected = collect_files(files, fallback_folder).and_then(|batch| self.check_size(batch));
        self.finish_selection(previous, selected)
    }

    /// Select every file beneath a directory, walking it recursively.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn select_directory(&mut self, directory: &dyn DirectoryHandle) -> Result<&Batch> {
        let previous = self.begin_selection()?;
        let selected = collect_tree(directory).await.and_then(|batch| self.check_size(batch));
        self.finish_selection(previous, selected)
    }

    /// Discard the current selection.
    pub fn reset(&mut self) {
        if self.phase == Phase::Idle {
            return;
        }
        tracing::debug!(folder = ?self.folder_name, "Selection discarded");
        self.clear();
    }

    /// Compress and upload the selected batch, failing on the first upload
    /// error.
    ///
    /// Whatever the outcome, the session ends up [`Idle`](Phase::Idle) with
    /// no selection. A panic inside an upload is re-raised once the session
    /// has been reset.
    pub async fn submit(&mut self) -> Result<Vec<Receipt>> {
        let (folder_name, entries) = self.begin_upload().await?;
        let total = entries.len();
        let tracker = ProgressTracker::new(self.progress.clone(), total);
        let uploading = upload_all(self.backend.clone(), entries, self.settings.upload_options.clone(), tracker);
        let outcome = AssertUnwindSafe(uploading).catch_unwind().await;
        self.clear();
        match outcome {
            Ok(Ok(results)) => {
                let receipts: Vec<_> = results.into_iter().filter_map(|result| result.into_result().ok()).collect();
                tracing::info!(folder = %folder_name, files = receipts.len(), "Files uploaded successfully");
                Ok(receipts)
            },
            Ok(Err(err)) => {
                tracing::error!(folder = %folder_name, error = %err, "Upload failed");
                Err(err)
            },
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Like [`submit`](Self::submit), but waits for every upload and reports
    /// each entry's outcome instead of failing on the first error.
    pub async fn submit_settled(&mut self) -> Result<Vec<UploadResult>> {
        let (folder_name, entries) = self.begin_upload().await?;
        let total = entries.len();
        let tracker = ProgressTracker::new(self.progress.clone(), total);
        let uploading = upload_settled(self.backend.clone(), entries, self.settings.upload_options.clone(), tracker);
        let outcome = AssertUnwindSafe(uploading).catch_unwind().await;
        self.clear();
        let results = outcome.unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        let failed = results.iter().filter(|result| !result.is_success()).count();
        if failed == 0 {
            tracing::info!(folder = %folder_name, files = total, "Files uploaded successfully");
        } else {
            tracing::warn!(folder = %folder_name, files = total, failed, "Some files could not be uploaded");
        }
        Ok(results)
    }

    fn begin_selection(&mut self) -> Result<Phase> {
        if self.phase == Phase::Uploading {
            exn::bail!(ErrorKind::NotReady(self.phase));
        }
        let previous = self.phase;
        self.phase = Phase::Selecting;
        Ok(previous)
    }

    fn check_size(&self, batch: Batch) -> Result<Batch> {
        guard::validate(&batch, self.settings.max_batch_bytes)?;
        Ok(batch)
    }

    fn finish_selection(&mut self, previous: Phase, selected: Result<Batch>) -> Result<&Batch> {
        match selected {
            Ok(batch) => {
                tracing::info!(
                    folder = batch.folder_name(),
                    files = batch.len(),
                    total_mb = guard::total_megabytes(&batch),
                    "Folder selected"
                );
                self.phase = Phase::Ready;
                self.folder_name = Some(batch.folder_name().to_string());
                Ok(self.batch.insert(batch))
            },
            Err(err) => {
                self.phase = previous;
                Err(err)
            },
        }
    }

    /// Take the batch for uploading and run it through compression.
    async fn begin_upload(&mut self) -> Result<(String, Vec<Entry>)> {
        if self.phase != Phase::Ready {
            exn::bail!(ErrorKind::NotReady(self.phase));
        }
        let Some(batch) = self.batch.take() else {
            exn::bail!(ErrorKind::NotReady(Phase::Idle));
        };
        self.phase = Phase::Uploading;
        self.progress.reset();
        let folder_name = batch.folder_name().to_string();
        tracing::info!(folder = %folder_name, files = batch.len(), backend = self.backend.name(), "Uploading");
        let entries = match self.settings.compressor {
            Some(compressor) => compress_all(compressor, self.settings.compression_timeout, batch.into_entries()).await,
            None => batch.into_entries(),
        };
        Ok((folder_name, entries))
    }

    fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.batch = None;
        self.folder_name = None;
    }
}
