use hoist_compress::{DEFAULT_MIME_TYPE, mime_from_magic_bytes, mime_from_path};

/// A file as handed over by a picker or resolved from a directory handle,
/// before it has been stamped into an [`Entry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    /// Path relative to (and including) the chosen root folder, when the
    /// source provides one.
    pub relative_path: Option<String>,
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}
impl SelectedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Stamp the file with its final relative path.
    ///
    /// A missing content type is guessed from the file name, then from the
    /// first few bytes.
    pub(crate) fn into_entry(self, relative_path: String) -> Entry {
        let mime_type = self.mime_type.unwrap_or_else(|| match mime_from_path(&self.name) {
            DEFAULT_MIME_TYPE => mime_from_magic_bytes(&self.data).unwrap_or(DEFAULT_MIME_TYPE).to_string(),
            guessed => guessed.to_string(),
        });
        Entry::new(relative_path, self.data, mime_type)
    }
}

/// One file of a batch: its destination-relative path and payload.
///
/// The relative path is fixed at construction; its first segment is the
/// name of the selected folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    relative_path: String,
    payload: Vec<u8>,
    mime_type: String,
}
impl Entry {
    pub fn new(relative_path: impl Into<String>, payload: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            payload: payload.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// File name (the last path segment).
    pub fn name(&self) -> &str {
        self.relative_path.rsplit('/').next().unwrap_or(&self.relative_path)
    }

    /// Folder name (the first path segment).
    pub fn folder(&self) -> &str {
        self.relative_path.split('/').next().unwrap_or(&self.relative_path)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn size(&self) -> u64 {
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        u64::try_from(self.payload.len()).unwrap_or(u64::MAX)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Same path, new bytes.
    pub(crate) fn with_payload(self, payload: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            relative_path: self.relative_path,
            payload,
            mime_type: mime_type.into(),
        }
    }
}

/// Every entry derived from one folder selection.
///
/// A new selection always produces a new batch; batches are never merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    folder_name: String,
    entries: Vec<Entry>,
    total_size: u64,
}
impl Batch {
    pub(crate) fn new(folder_name: impl Into<String>, entries: Vec<Entry>) -> Self {
        let total_size = entries.iter().map(Entry::size).sum();
        Self {
            folder_name: folder_name.into(),
            entries,
            total_size,
        }
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every entry's size, in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_segments() {
        let entry = Entry::new("photos/2024/beach.jpg", vec![0; 12], "image/jpeg");
        assert_eq!(entry.name(), "beach.jpg");
        assert_eq!(entry.folder(), "photos");
        assert_eq!(entry.size(), 12);
    }

    #[test]
    fn with_payload_keeps_path() {
        let entry = Entry::new("photos/scan.png", vec![1, 2, 3], "image/png");
        let entry = entry.with_payload(vec![9], "image/jpeg");
        assert_eq!(entry.relative_path(), "photos/scan.png");
        assert_eq!(entry.name(), "scan.png");
        assert_eq!(entry.mime_type(), "image/jpeg");
        assert_eq!(entry.payload(), &[9]);
    }

    #[test]
    fn batch_total_size() {
        let batch = Batch::new(
            "photos",
            vec![Entry::new("photos/a.jpg", vec![0; 600], "image/jpeg"), Entry::new("photos/b.txt", vec![0; 7], "text/plain")],
        );
        assert_eq!(batch.total_size(), 607);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.folder_name(), batch.entries()[0].folder());
    }

    #[test]
    fn selected_file_guesses_mime_type() {
        let entry = SelectedFile::new("beach.JPG", b"jpeg".to_vec()).into_entry("photos/beach.JPG".to_string());
        assert_eq!(entry.mime_type(), "image/jpeg");
        let entry = SelectedFile::new("notes", b"plain".to_vec())
            .with_mime_type("text/plain")
            .into_entry("photos/notes".to_string());
        assert_eq!(entry.mime_type(), "text/plain");
    }

    #[test]
    fn selected_file_sniffs_extensionless_images() {
        let png = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0, 0, 0, 0];
        let entry = SelectedFile::new("IMG_0001", png.to_vec()).into_entry("photos/IMG_0001".to_string());
        assert_eq!(entry.mime_type(), "image/png");
        let entry = SelectedFile::new("README", b"hello".to_vec()).into_entry("photos/README".to_string());
        assert_eq!(entry.mime_type(), DEFAULT_MIME_TYPE);
    }
}
