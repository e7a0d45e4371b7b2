//! Destination path validation.
//!
//! Every upload destination is a relative path beneath the storage root (or
//! bucket prefix). Paths come from user-selected directory trees, so they are
//! untrusted: this module makes sure they can't climb out of the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a destination path.
///
/// `.` and empty components are dropped, `..` is resolved as long as it never
/// leaves the root, and NUL bytes are rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use hoist_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("photos/2024/beach.jpg").is_ok());
/// assert!(validate_path("photos/raw/../beach.jpg").is_ok()); // (never leaves the root)
/// // Invalid paths
/// assert!(validate_path("../photos/beach.jpg").is_err());
/// assert!(validate_path("photos/../../beach.jpg").is_err());
/// assert!(validate_path("photos/be\0ach.jpg").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("photos//./raw/../beach.jpg/").unwrap(),
///     Path::new("photos/beach.jpg")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(segment)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}

/// Render a validated path as an object key (always `/`-separated).
///
/// ```
/// use hoist_storage::{to_key, validate_path};
///
/// assert_eq!(to_key(&validate_path("/photos/raw/../beach.jpg").unwrap()), "photos/beach.jpg");
/// ```
pub fn to_key(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
