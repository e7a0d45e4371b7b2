//! Error types for the [`collect`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A collection error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a collection failure.
///
/// ### Selection Errors
/// - [`ErrorKind::EmptySelection`]
/// - [`ErrorKind::InvalidPath`]
///
/// ### Source Errors
/// - [`ErrorKind::ReadDirectory`]
/// - [`ErrorKind::ResolveFile`]
/// - [`ErrorKind::Io`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The selection contained no files, so there is no folder to name.
    #[display("no files were selected")]
    EmptySelection,
    /// A name or relative path would escape the selected folder, or is empty.
    #[display("invalid relative path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// Listing the children of a directory failed.
    #[display("could not read directory: {_0}")]
    ReadDirectory(#[error(not(source))] String),
    /// Turning a file handle into bytes failed.
    #[display("could not resolve file: {_0}")]
    ResolveFile(#[error(not(source))] String),
    /// Underlying I/O failure inside a directory source.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReadDirectory(_) | Self::ResolveFile(_) | Self::Io)
    }
}
