//! Compression Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A compression error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for compression operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input is corrupt, truncated, or not an image format we can read.
    /// Don't retry with the same input.
    #[display("invalid or corrupted image data")]
    Decode,
    /// Re-encoding the image as JPEG failed.
    #[display("failed to encode JPEG")]
    Encode,
    /// Compression options are out of range.
    #[display("invalid compression options: {_0}")]
    InvalidOptions(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
