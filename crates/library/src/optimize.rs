//! Best-effort image recompression ahead of upload.
//!
//! Every failure is absorbed here: a batch never fails because an image
//! couldn't be made smaller.

use crate::collect::Entry;
use hoist_compress::{ImageCompressor, JPEG_MIME_TYPE, is_image};
use std::time::Duration;

enum Outcome {
    Transformed(Entry),
    Unchanged(Entry),
}

impl Outcome {
    fn into_entry(self) -> Entry {
        match self {
            Self::Transformed(entry) | Self::Unchanged(entry) => entry,
        }
    }
}

/// Recompress a single entry if it is an image.
///
/// The relative path (and therefore the file name) is always preserved. On
/// success the payload is JPEG and the MIME type becomes `image/jpeg`; on any
/// failure, timeout included, the original entry comes back untouched.
pub async fn compress_entry(compressor: ImageCompressor, timeout: Duration, entry: Entry) -> Entry {
    if !is_image(entry.mime_type()) {
        return entry;
    }
    match try_compress(compressor, timeout, entry).await {
        Outcome::Transformed(entry) => {
            tracing::debug!(path = entry.relative_path(), size = entry.size(), "Compressed image");
            entry
        },
        outcome => outcome.into_entry(),
    }
}

/// Run [`compress_entry`] over every entry concurrently, keeping order.
pub async fn compress_all(compressor: ImageCompressor, timeout: Duration, entries: Vec<Entry>) -> Vec<Entry> {
    futures::future::join_all(entries.into_iter().map(|entry| compress_entry(compressor, timeout, entry))).await
}

async fn try_compress(compressor: ImageCompressor, timeout: Duration, entry: Entry) -> Outcome {
    let input = entry.payload().to_vec();
    let task = tokio::task::spawn_blocking(move || compressor.compress(&input));
    let output = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(output))) => output,
        Ok(Ok(Err(err))) => {
            tracing::warn!(path = entry.relative_path(), error = %err, "Could not compress image; uploading original");
            return Outcome::Unchanged(entry);
        },
        Ok(Err(err)) => {
            tracing::warn!(path = entry.relative_path(), error = %err, "Compression task failed; uploading original");
            return Outcome::Unchanged(entry);
        },
        Err(_) => {
            tracing::warn!(path = entry.relative_path(), ?timeout, "Compression timed out; uploading original");
            return Outcome::Unchanged(entry);
        },
    };
    if output.len() >= entry.payload().len() {
        tracing::warn!(
            path = entry.relative_path(),
            original = entry.size(),
            compressed = output.len(),
            "Compressed image is not smaller; uploading original"
        );
        return Outcome::Unchanged(entry);
    }
    Outcome::Transformed(entry.with_payload(output, JPEG_MIME_TYPE))
}
