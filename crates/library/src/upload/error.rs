//! Error types for the [`upload`](super) module.

use derive_more::{Display, Error};

/// An upload error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The storage backend rejected or failed to complete the upload.
    #[display("could not upload {_0}")]
    Transport(#[error(not(source))] String),
    /// The upload task was cancelled before it finished (runtime shutdown).
    #[display("upload of {_0} was interrupted")]
    Interrupted(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Relative path of the entry that failed.
    pub fn path(&self) -> &str {
        match self {
            Self::Transport(path) | Self::Interrupted(path) => path,
        }
    }
}
