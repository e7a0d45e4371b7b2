//! Turning a folder selection into a [`Batch`].
//!
//! Two sources are supported, and both end in the same shape:
//!
//! - A flat list of [`SelectedFile`]s that already carry their path relative
//!   to the chosen folder, like a native folder picker provides
//!   ([`collect_files`], fed by [`pick_files`] for local directories).
//! - A [`DirectoryHandle`] that has to be walked recursively, reading each
//!   directory's children page by page ([`collect_tree`], with
//!   [`LocalDirectory`] for local directories).

mod entry;
pub mod error;
mod files;
mod local;
#[cfg(any(test, feature = "mock"))]
mod memory;
mod tree;

pub use self::entry::{Batch, Entry, SelectedFile};
pub use self::files::collect_files;
pub use self::local::{LocalDirectory, pick_files};
#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryDirectory;
pub use self::tree::{DirectoryHandle, DirectoryReader, FileHandle, Node, collect_tree};
use self::error::{ErrorKind, Result};

/// A single path segment: non-empty, no separators, not `.` or `..`.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        exn::bail!(ErrorKind::InvalidPath(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::check_name;
    use rstest::rstest;

    #[rstest]
    #[case("beach.jpg", true)]
    #[case(".hidden", true)]
    #[case("", false)]
    #[case(".", false)]
    #[case("..", false)]
    #[case("a/b", false)]
    #[case("a\\b", false)]
    #[case("a\0b", false)]
    fn test_check_name(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(check_name(name).is_ok(), valid);
    }
}
