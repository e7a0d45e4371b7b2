//! Library Error Types
//!
//! Each module keeps its own `ErrorKind` close to the code that raises it;
//! the public entry points wrap those in the coarse categories below using
//! [`or_raise`](exn::ResultExt::or_raise), so callers can branch on the
//! category and still print the full error tree.

use crate::session::Phase;
use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not collect the selected files")]
    Collect,
    #[display("selection is {} MB, over the {} MB limit", megabytes(*total_bytes), megabytes(*limit_bytes))]
    SizeExceeded { total_bytes: u64, limit_bytes: u64 },
    #[display("upload failed")]
    Upload,
    /// The session was asked to do something its current phase doesn't allow.
    #[display("nothing to upload while {_0}")]
    NotReady(#[error(not(source))] Phase),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload)
    }
}

fn megabytes(bytes: u64) -> String {
    format!("{:.2}", crate::guard::megabytes(bytes))
}
