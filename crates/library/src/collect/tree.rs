use crate::collect::check_name;
use crate::collect::entry::{Batch, Entry, SelectedFile};
use crate::collect::error::{Error as CollectError, ErrorKind, Result as CollectResult};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use async_trait::async_trait;
use exn::ResultExt;
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};

/// A child returned by a [`DirectoryReader`].
pub enum Node {
    File(Box<dyn FileHandle>),
    Directory(Box<dyn DirectoryHandle>),
}

/// A directory that can be listed.
#[async_trait]
pub trait DirectoryHandle: Send + Sync {
    fn name(&self) -> &str;

    /// A fresh reader over this directory's immediate children.
    async fn reader(&self) -> CollectResult<Box<dyn DirectoryReader>>;
}

/// Paginated listing of one directory.
///
/// Sources may hand out children in several pages; the listing is only
/// complete once a call returns an empty page.
#[async_trait]
pub trait DirectoryReader: Send {
    async fn read_entries(&mut self) -> CollectResult<Vec<Node>>;
}

/// A file that has not been read yet.
#[async_trait]
pub trait FileHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn file(&self) -> CollectResult<SelectedFile>;
}

/// Walks `root` recursively and builds a [`Batch`] of every file beneath it.
///
/// Each entry's relative path starts with `root`'s name followed by the names
/// of every directory on the way down. Siblings are resolved concurrently;
/// the first failure anywhere fails the whole walk.
pub async fn collect_tree(root: &dyn DirectoryHandle) -> LibraryResult<Batch> {
    collect_tree_inner(root).await.or_raise(|| LibraryErrorKind::Collect)
}

pub(crate) async fn collect_tree_inner(root: &dyn DirectoryHandle) -> CollectResult<Batch> {
    let folder_name = root.name().to_string();
    check_name(&folder_name)?;
    let entries = walk(root, folder_name.clone()).await?;
    if entries.is_empty() {
        exn::bail!(ErrorKind::EmptySelection);
    }
    tracing::debug!(folder = %folder_name, files = entries.len(), "Collected directory tree");
    Ok(Batch::new(folder_name, entries))
}

fn walk(directory: &dyn DirectoryHandle, path: String) -> BoxFuture<'_, CollectResult<Vec<Entry>>> {
    async move {
        let children = read_all(directory, &path).await?;
        let pending = children.into_iter().map(|node| {
            let path = path.as_str();
            match node {
                Node::File(file) => async move {
                    check_name(file.name())?;
                    let relative_path = format!("{path}/{}", file.name());
                    let selected = file.file().await.or_raise(|| ErrorKind::ResolveFile(relative_path.clone()))?;
                    Ok::<_, CollectError>(vec![selected.into_entry(relative_path)])
                }
                .boxed(),
                Node::Directory(directory) => async move {
                    check_name(directory.name())?;
                    let child_path = format!("{path}/{}", directory.name());
                    walk(directory.as_ref(), child_path).await
                }
                .boxed(),
            }
        });
        let nested: Vec<Vec<Entry>> = try_join_all(pending).await?;
        Ok::<_, CollectError>(nested.into_iter().flatten().collect())
    }
    .boxed()
}

/// Drain a directory's reader until it hands back an empty page.
async fn read_all(directory: &dyn DirectoryHandle, path: &str) -> CollectResult<Vec<Node>> {
    let mut reader = directory.reader().await.or_raise(|| ErrorKind::ReadDirectory(path.to_string()))?;
    let mut children = Vec::new();
    loop {
        let page = reader.read_entries().await.or_raise(|| ErrorKind::ReadDirectory(path.to_string()))?;
        if page.is_empty() {
            break;
        }
        tracing::trace!(path, page = page.len(), "Read directory page");
        children.extend(page);
    }
    Ok(children)
}
