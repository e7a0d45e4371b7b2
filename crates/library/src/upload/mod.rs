//! Concurrent upload of a batch's entries.
//!
//! Every entry gets its own task the moment an upload starts; there is no
//! queue in front of the storage backend. Per-entry progress is folded into
//! a single overall percentage by [`progress`].

pub mod error;
pub mod progress;
mod stream;

pub use self::progress::{ProgressState, ProgressTracker, combine};
pub use self::stream::{Outcome, UploadEvent, UploadResult, upload_all, upload_settled, upload_stream};
