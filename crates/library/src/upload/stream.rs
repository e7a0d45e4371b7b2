use crate::collect::Entry;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::upload::error::{self, ErrorKind};
use crate::upload::progress::ProgressTracker;
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use hoist_storage::{BackendHandle, Receipt, UploadOptions};
use std::path::Path;

/// What happened to one entry.
#[derive(Debug)]
pub enum Outcome {
    Success(Receipt),
    Failure(error::Error),
}

/// The outcome of uploading the entry at `entry_index`.
#[derive(Debug)]
pub struct UploadResult {
    pub entry_index: usize,
    pub relative_path: String,
    pub outcome: Outcome,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match &self.outcome {
            Outcome::Success(receipt) => Some(receipt),
            Outcome::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> error::Result<Receipt> {
        match self.outcome {
            Outcome::Success(receipt) => Ok(receipt),
            Outcome::Failure(err) => Err(err),
        }
    }
}

pub enum UploadEvent {
    Started { total: usize },
    /// Emitted as each upload finishes, in completion order.
    Uploaded(UploadResult),
    Complete,
}

/// Start one upload per entry, all at once, and stream their results as
/// they finish.
///
/// Every upload is spawned as its own task before the first event is
/// yielded. Dropping the stream stops observing the uploads but does not
/// cancel them. A panicking upload is re-raised on the task polling the
/// stream.
pub fn upload_stream(
    backend: BackendHandle,
    entries: Vec<Entry>,
    options: UploadOptions,
    tracker: ProgressTracker,
) -> impl Stream<Item = UploadEvent> {
    let total = entries.len();
    let mut pending = FuturesUnordered::new();
    for (entry_index, entry) in entries.into_iter().enumerate() {
        let relative_path = entry.relative_path().to_string();
        let handle = tokio::spawn(upload_entry(
            backend.clone(),
            entry_index,
            entry,
            options.clone(),
            tracker.clone(),
        ));
        pending.push(async move { (entry_index, relative_path, handle.await) });
    }
    tracing::debug!(backend = backend.name(), total, "Started uploads");

    stream! {
        yield UploadEvent::Started { total };
        while let Some((entry_index, relative_path, joined)) = pending.next().await {
            let outcome = match joined {
                Ok(Ok(receipt)) => Outcome::Success(receipt),
                Ok(Err(err)) => {
                    tracing::warn!(path = %relative_path, error = %err, "Upload failed");
                    Outcome::Failure(err)
                },
                Err(err) => match err.try_into_panic() {
                    // Not ours to interpret; let it unwind on the caller's task.
                    Ok(payload) => std::panic::resume_unwind(payload),
                    Err(_) => Outcome::Failure(exn::Exn::from(ErrorKind::Interrupted(relative_path.clone()))),
                },
            };
            yield UploadEvent::Uploaded(UploadResult { entry_index, relative_path, outcome });
        }
        yield UploadEvent::Complete;
    }
}

async fn upload_entry(
    backend: BackendHandle,
    entry_index: usize,
    entry: Entry,
    options: UploadOptions,
    tracker: ProgressTracker,
) -> error::Result<Receipt> {
    let options = options.with_content_type(entry.mime_type());
    let on_progress = |percent: f64| tracker.report(entry_index, percent);
    let receipt = backend
        .upload(Path::new(entry.relative_path()), entry.payload(), &options, &on_progress)
        .await
        .or_raise(|| ErrorKind::Transport(entry.relative_path().to_string()))?;
    tracing::debug!(path = entry.relative_path(), url = %receipt.url, "Uploaded");
    Ok(receipt)
}

/// Upload every entry concurrently, failing as soon as any single upload
/// fails.
///
/// On success the results are in entry order and the tracker is finished.
/// On failure, uploads still in flight carry on in the background and their
/// outcomes are discarded.
pub async fn upload_all(
    backend: BackendHandle,
    entries: Vec<Entry>,
    options: UploadOptions,
    tracker: ProgressTracker,
) -> LibraryResult<Vec<UploadResult>> {
    upload_all_inner(backend, entries, options, tracker).await.or_raise(|| LibraryErrorKind::Upload)
}

pub(crate) async fn upload_all_inner(
    backend: BackendHandle,
    entries: Vec<Entry>,
    options: UploadOptions,
    tracker: ProgressTracker,
) -> error::Result<Vec<UploadResult>> {
    let mut results = Vec::with_capacity(entries.len());
    let events = upload_stream(backend, entries, options, tracker.clone());
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        let UploadEvent::Uploaded(result) = event else {
            continue;
        };
        match result.outcome {
            Outcome::Success(_) => results.push(result),
            Outcome::Failure(err) => return Err(err),
        }
    }
    results.sort_by_key(|result| result.entry_index);
    tracker.finish();
    Ok(results)
}

/// Upload every entry concurrently and wait for all of them, reporting each
/// entry's outcome instead of failing.
///
/// Results are in entry order. The tracker is finished regardless of how
/// many uploads failed.
pub async fn upload_settled(
    backend: BackendHandle,
    entries: Vec<Entry>,
    options: UploadOptions,
    tracker: ProgressTracker,
) -> Vec<UploadResult> {
    let mut results = Vec::with_capacity(entries.len());
    let events = upload_stream(backend, entries, options, tracker.clone());
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        if let UploadEvent::Uploaded(result) = event {
            results.push(result);
        }
    }
    results.sort_by_key(|result| result.entry_index);
    tracker.finish();
    results
}
