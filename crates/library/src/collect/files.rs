use crate::collect::entry::{Batch, SelectedFile};
use crate::collect::error::{ErrorKind, Result as CollectResult};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use exn::ResultExt;
use hoist_storage::{to_key, validate_path};

/// Builds a [`Batch`] from a flat file list, as produced by a folder picker.
///
/// Each file keeps the relative path it arrived with, normalized; files
/// without one are placed directly under `fallback_folder`. The batch's folder
/// name is the first segment of the first file's path, and every other file
/// must sit beneath that same folder.
///
/// # Examples
///
/// ```
/// use hoist_library::collect::{SelectedFile, collect_files};
///
/// let batch = collect_files(
///     vec![
///         SelectedFile::new("a.jpg", b"...".to_vec()).with_relative_path("photos/a.jpg"),
///         SelectedFile::new("b.jpg", b"...".to_vec()),
///     ],
///     "photos",
/// )
/// .unwrap();
/// assert_eq!(batch.folder_name(), "photos");
/// assert_eq!(batch.entries()[1].relative_path(), "photos/b.jpg");
/// ```
pub fn collect_files(files: Vec<SelectedFile>, fallback_folder: &str) -> LibraryResult<Batch> {
    collect_files_inner(files, fallback_folder).or_raise(|| LibraryErrorKind::Collect)
}

pub(crate) fn collect_files_inner(files: Vec<SelectedFile>, fallback_folder: &str) -> CollectResult<Batch> {
    if files.is_empty() {
        exn::bail!(ErrorKind::EmptySelection);
    }
    let mut folder_name: Option<String> = None;
    let mut entries = Vec::with_capacity(files.len());
    for mut file in files {
        let raw = file.relative_path.take().unwrap_or_else(|| format!("{fallback_folder}/{}", file.name));
        let relative_path = normalize(&raw)?;
        let entry = file.into_entry(relative_path);
        let folder = folder_name.get_or_insert_with(|| entry.folder().to_string());
        if folder.as_str() != entry.folder() {
            exn::bail!(ErrorKind::InvalidPath(raw));
        }
        entries.push(entry);
    }
    let folder_name = folder_name.unwrap_or_default();
    tracing::debug!(folder = %folder_name, files = entries.len(), "Collected file list");
    Ok(Batch::new(folder_name, entries))
}

/// Resolve `.`, `..` and repeated separators. The result must still name a
/// file inside a folder.
fn normalize(raw: &str) -> CollectResult<String> {
    let validated = validate_path(raw).or_raise(|| ErrorKind::InvalidPath(raw.to_string()))?;
    let relative_path = to_key(&validated);
    if !relative_path.contains('/') {
        exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
    }
    Ok(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_relative_paths_kept() {
        let files = vec![
            SelectedFile::new("a.jpg", vec![0; 10]).with_relative_path("photos/a.jpg"),
            SelectedFile::new("b.jpg", vec![0; 20]).with_relative_path("photos/2024/b.jpg"),
        ];
        let batch = collect_files_inner(files, "ignored").unwrap();
        assert_eq!(batch.folder_name(), "photos");
        assert_eq!(batch.total_size(), 30);
        let paths: Vec<_> = batch.entries().iter().map(|e| e.relative_path()).collect();
        assert_eq!(paths, vec!["photos/a.jpg", "photos/2024/b.jpg"]);
    }

    #[test]
    fn test_fallback_folder() {
        let files = vec![SelectedFile::new("notes.txt", b"hi".to_vec())];
        let batch = collect_files_inner(files, "documents").unwrap();
        assert_eq!(batch.folder_name(), "documents");
        assert_eq!(batch.entries()[0].relative_path(), "documents/notes.txt");
        assert_eq!(batch.entries()[0].mime_type(), "text/plain");
    }

    #[test]
    fn test_empty_selection() {
        let err = collect_files_inner(vec![], "photos").unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptySelection));
    }

    #[test]
    fn test_escaping_path_rejected() {
        let files = vec![SelectedFile::new("passwd", b"x".to_vec()).with_relative_path("../etc/passwd")];
        let err = collect_files_inner(files, "photos").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(path) if path == "../etc/passwd"));
    }

    #[rstest]
    #[case("photos/../docs/a.jpg")]
    #[case("photos/..")]
    #[case("a.jpg")]
    #[case("/a.jpg")]
    fn test_paths_outside_the_folder_rejected(#[case] path: &str) {
        let files = vec![
            SelectedFile::new("a.jpg", b"x".to_vec()).with_relative_path("photos/a.jpg"),
            SelectedFile::new("b.jpg", b"x".to_vec()).with_relative_path(path),
        ];
        let err = collect_files_inner(files, "photos").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(rejected) if rejected == path));
    }

    #[test]
    fn test_paths_are_normalized() {
        let files = vec![
            SelectedFile::new("a.jpg", b"x".to_vec()).with_relative_path("/photos/a.jpg"),
            SelectedFile::new("b.jpg", b"x".to_vec()).with_relative_path("photos//raw/../b.jpg"),
            SelectedFile::new("c.jpg", b"x".to_vec()).with_relative_path("./photos/2024/c.jpg"),
        ];
        let batch = collect_files_inner(files, "ignored").unwrap();
        assert_eq!(batch.folder_name(), "photos");
        let paths: Vec<_> = batch.entries().iter().map(|e| e.relative_path()).collect();
        assert_eq!(paths, vec!["photos/a.jpg", "photos/b.jpg", "photos/2024/c.jpg"]);
    }

    #[test]
    fn test_folder_comes_from_the_first_resolved_path() {
        let files = vec![
            SelectedFile::new("a.jpg", b"x".to_vec()).with_relative_path("photos/../docs/a.jpg"),
            SelectedFile::new("b.jpg", b"x".to_vec()).with_relative_path("photos/b.jpg"),
        ];
        let err = collect_files_inner(files, "photos").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(rejected) if rejected == "photos/b.jpg"));
    }

    #[test]
    fn test_public_wrapper_raises_collect() {
        let err = collect_files(vec![], "photos").unwrap_err();
        assert!(matches!(&*err, LibraryErrorKind::Collect));
    }
}
