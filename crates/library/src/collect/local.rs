//! Local filesystem sources for both collection modes.

use crate::collect::entry::SelectedFile;
use crate::collect::error::{ErrorKind, Result as CollectResult};
use crate::collect::tree::{DirectoryHandle, DirectoryReader, FileHandle, Node};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use async_trait::async_trait;
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

const PAGE_SIZE: usize = 100;

/// A directory on the local filesystem.
///
/// Symbolic links and special files are skipped, so a walk can never loop.
#[derive(Clone, Debug)]
pub struct LocalDirectory {
    path: PathBuf,
    name: String,
    page_size: usize,
}

impl LocalDirectory {
    /// Open `path`, which must be an existing directory.
    pub async fn open(path: impl AsRef<Path>) -> CollectResult<Self> {
        let display = path.as_ref().display().to_string();
        // Canonicalized so that "." and "photos/.." still have a name.
        let path = fs::canonicalize(path.as_ref()).await.or_raise(|| ErrorKind::ReadDirectory(display.clone()))?;
        let metadata = fs::metadata(&path).await.or_raise(|| ErrorKind::ReadDirectory(display.clone()))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::ReadDirectory(display));
        }
        let name = match path.file_name() {
            Some(name) => utf8_name(name.to_os_string(), &path)?,
            None => exn::bail!(ErrorKind::InvalidPath(display)),
        };
        Ok(Self { path, name, page_size: PAGE_SIZE })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reader(&self) -> CollectResult<Box<dyn DirectoryReader>> {
        let entries = fs::read_dir(&self.path).await.or_raise(|| ErrorKind::Io)?;
        Ok(Box::new(LocalReader { entries, page_size: self.page_size }))
    }
}

struct LocalReader {
    entries: fs::ReadDir,
    page_size: usize,
}

#[async_trait]
impl DirectoryReader for LocalReader {
    async fn read_entries(&mut self) -> CollectResult<Vec<Node>> {
        let mut page = Vec::with_capacity(self.page_size);
        // Only exhaustion may produce an empty page; skipped entries don't count.
        while page.len() < self.page_size {
            let Some(entry) = self.entries.next_entry().await.or_raise(|| ErrorKind::Io)? else {
                break;
            };
            let file_type = entry.file_type().await.or_raise(|| ErrorKind::Io)?;
            let path = entry.path();
            let name = utf8_name(entry.file_name(), &path)?;
            if file_type.is_dir() {
                page.push(Node::Directory(Box::new(LocalDirectory { path, name, page_size: self.page_size })));
            } else if file_type.is_file() {
                page.push(Node::File(Box::new(LocalFile { path, name })));
            } else {
                tracing::debug!(path = %path.display(), "Skipping entry that is neither a file nor a directory");
            }
        }
        Ok(page)
    }
}

struct LocalFile {
    path: PathBuf,
    name: String,
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn file(&self) -> CollectResult<SelectedFile> {
        let data = fs::read(&self.path).await.or_raise(|| ErrorKind::Io)?;
        Ok(SelectedFile::new(self.name.clone(), data))
    }
}

/// Read every regular file beneath `root` into a flat list, the way a folder
/// picker would hand it over: each file carries its path relative to (and
/// including) `root`'s own name. Results are sorted by that path.
pub async fn pick_files(root: impl AsRef<Path>) -> LibraryResult<Vec<SelectedFile>> {
    pick_files_inner(root.as_ref()).await.or_raise(|| LibraryErrorKind::Collect)
}

async fn pick_files_inner(root: &Path) -> CollectResult<Vec<SelectedFile>> {
    let root = LocalDirectory::open(root).await?;
    let mut files = Vec::new();
    let mut stack = vec![(root.path.clone(), root.name.clone())];
    while let Some((current, relative)) = stack.pop() {
        let mut entries = fs::read_dir(&current).await.or_raise(|| ErrorKind::ReadDirectory(relative.clone()))?;
        while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::ReadDirectory(relative.clone()))? {
            let file_type = entry.file_type().await.or_raise(|| ErrorKind::Io)?;
            let name = utf8_name(entry.file_name(), &entry.path())?;
            let relative_path = format!("{relative}/{name}");
            if file_type.is_dir() {
                stack.push((entry.path(), relative_path));
            } else if file_type.is_file() {
                let data = fs::read(entry.path()).await.or_raise(|| ErrorKind::ResolveFile(relative_path.clone()))?;
                files.push(SelectedFile::new(name, data).with_relative_path(relative_path));
            }
        }
    }
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!(root = %root.path.display(), files = files.len(), "Picked local files");
    Ok(files)
}

/// Destination keys are UTF-8; a name that isn't can't be uploaded faithfully.
fn utf8_name(name: OsString, path: &Path) -> CollectResult<String> {
    name.into_string().map_err(|_| {
        tracing::warn!(path = %path.display(), "File name is not valid UTF-8");
        exn::Exn::from(ErrorKind::InvalidPath(path.display().to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::tree::collect_tree_inner;
    use std::fs as std_fs;

    fn fixture() -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        let photos = temp_dir.path().join("photos");
        std_fs::create_dir_all(photos.join("2024/june")).unwrap();
        std_fs::write(photos.join("a.jpg"), vec![0; 10]).unwrap();
        std_fs::write(photos.join("2024/b.jpg"), vec![0; 20]).unwrap();
        std_fs::write(photos.join("2024/june/c.png"), vec![0; 30]).unwrap();
        temp_dir
    }

    #[tokio::test]
    async fn test_pick_files() {
        let temp_dir = fixture();
        let files = pick_files(temp_dir.path().join("photos")).await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_deref().unwrap()).collect();
        assert_eq!(paths, vec!["photos/2024/b.jpg", "photos/2024/june/c.png", "photos/a.jpg"]);
        assert_eq!(files[1].name, "c.png");
        assert_eq!(files[1].data.len(), 30);
    }

    #[tokio::test]
    async fn test_local_tree_matches_pick_files() {
        let temp_dir = fixture();
        let root = LocalDirectory::open(temp_dir.path().join("photos")).await.unwrap().with_page_size(1);
        assert_eq!(root.name(), "photos");
        let batch = collect_tree_inner(&root).await.unwrap();
        let mut paths: Vec<_> = batch.entries().iter().map(|e| e.relative_path()).collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["photos/2024/b.jpg", "photos/2024/june/c.png", "photos/a.jpg"]);
        assert_eq!(batch.total_size(), 60);
    }

    #[tokio::test]
    async fn test_open_dot_has_a_name() {
        let temp_dir = fixture();
        let root = LocalDirectory::open(temp_dir.path().join("photos/2024/..")).await.unwrap();
        assert_eq!(root.name(), "photos");
    }

    #[tokio::test]
    async fn test_open_rejects_files_and_missing_paths() {
        let temp_dir = fixture();
        let err = LocalDirectory::open(temp_dir.path().join("photos/a.jpg")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ReadDirectory(_)));
        assert!(LocalDirectory::open(temp_dir.path().join("missing")).await.is_err());
        assert!(pick_files(temp_dir.path().join("missing")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_skipped_without_ending_the_listing() {
        let temp_dir = fixture();
        let photos = temp_dir.path().join("photos");
        for i in 0..5 {
            std::os::unix::fs::symlink(photos.join("a.jpg"), photos.join(format!("link-{i}.jpg"))).unwrap();
        }
        let root = LocalDirectory::open(&photos).await.unwrap().with_page_size(1);
        let batch = collect_tree_inner(&root).await.unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_names_rejected() {
        use std::os::unix::ffi::OsStrExt;
        let temp_dir = fixture();
        let photos = temp_dir.path().join("photos");
        std_fs::write(photos.join(std::ffi::OsStr::from_bytes(b"bad-\xFF.jpg")), b"x").unwrap();

        let root = LocalDirectory::open(&photos).await.unwrap();
        let err = collect_tree_inner(&root).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ReadDirectory(_)));
        assert!(format!("{err:?}").contains("invalid relative path"));

        let err = pick_files_inner(&photos).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(path) if path.ends_with(".jpg")));
    }
}
