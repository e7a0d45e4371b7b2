//! In-memory directory trees for tests.

use crate::collect::entry::SelectedFile;
use crate::collect::error::{ErrorKind, Result};
use crate::collect::tree::{DirectoryHandle, DirectoryReader, FileHandle, Node};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Clone, Debug)]
enum MemoryNode {
    File { name: String, data: Vec<u8> },
    /// Listed like any other file, but fails to resolve.
    Broken { name: String },
    Directory(MemoryDirectory),
}

/// A directory tree held entirely in memory, served in configurable pages.
#[derive(Clone, Debug)]
pub struct MemoryDirectory {
    name: String,
    children: Vec<MemoryNode>,
    page_size: usize,
    pages_read: Arc<AtomicUsize>,
}

impl MemoryDirectory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            pages_read: Arc::default(),
        }
    }

    pub fn file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.children.push(MemoryNode::File { name: name.into(), data: data.into() });
        self
    }

    pub fn broken_file(mut self, name: impl Into<String>) -> Self {
        self.children.push(MemoryNode::Broken { name: name.into() });
        self
    }

    pub fn directory(mut self, directory: MemoryDirectory) -> Self {
        self.children.push(MemoryNode::Directory(directory));
        self
    }

    /// Page size for this directory and every subdirectory added so far.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self.children = self
            .children
            .into_iter()
            .map(|child| match child {
                MemoryNode::Directory(directory) => MemoryNode::Directory(directory.with_page_size(page_size)),
                other => other,
            })
            .collect();
        self
    }

    /// Number of `read_entries` calls made against this directory, including
    /// the final empty page.
    pub fn pages_read(&self) -> usize {
        self.pages_read.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reader(&self) -> Result<Box<dyn DirectoryReader>> {
        Ok(Box::new(MemoryReader {
            remaining: self.children.clone().into_iter(),
            page_size: self.page_size,
            pages_read: Arc::clone(&self.pages_read),
        }))
    }
}

struct MemoryReader {
    remaining: std::vec::IntoIter<MemoryNode>,
    page_size: usize,
    pages_read: Arc<AtomicUsize>,
}

#[async_trait]
impl DirectoryReader for MemoryReader {
    async fn read_entries(&mut self) -> Result<Vec<Node>> {
        self.pages_read.fetch_add(1, Ordering::SeqCst);
        let page = self.remaining.by_ref().take(self.page_size).map(|child| match child {
            MemoryNode::File { name, data } => Node::File(Box::new(MemoryFile { name, data: Some(data) })),
            MemoryNode::Broken { name } => Node::File(Box::new(MemoryFile { name, data: None })),
            MemoryNode::Directory(directory) => Node::Directory(Box::new(directory)),
        });
        Ok(page.collect())
    }
}

struct MemoryFile {
    name: String,
    data: Option<Vec<u8>>,
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn file(&self) -> Result<SelectedFile> {
        match &self.data {
            Some(data) => Ok(SelectedFile::new(self.name.clone(), data.clone())),
            None => exn::bail!(ErrorKind::Io),
        }
    }
}
