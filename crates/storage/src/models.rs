//! Storage models.
//!
//! Options passed into an upload and the receipt handed back once the
//! transport has accepted the bytes.

use derive_more::Display;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Default server-side endpoint that signs upload URLs.
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "/api/upload";

/// Visibility of an uploaded object.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Access {
    /// Anyone holding the URL may read the object.
    #[default]
    #[display("public")]
    Public,
}

/// Per-upload options handed to a [`StorageBackend`](crate::StorageBackend).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub access: Access,
    /// Endpoint used for the signed upload-URL handshake. Opaque to
    /// everything except the transport.
    pub authorization_endpoint: String,
    pub content_type: String,
}
impl UploadOptions {
    pub fn new(authorization_endpoint: impl Into<String>) -> Self {
        Self {
            access: Access::Public,
            authorization_endpoint: authorization_endpoint.into(),
            content_type: "application/octet-stream".to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}
impl Default for UploadOptions {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHORIZATION_ENDPOINT)
    }
}

/// Confirmation returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Destination path, relative to the storage root
    pub path: PathBuf,
    /// Where the object can be fetched from
    pub url: String,
    /// Uploaded size in bytes
    pub size: u64,
    pub content_type: String,
    /// BLAKE3 hash of the uploaded bytes
    pub content_hash: String,
    pub access: Access,
    pub uploaded: UtcDateTime,
}
impl Receipt {
    /// Build a receipt for `data` uploaded to `path`, hashing the payload.
    pub fn new(path: impl AsRef<Path>, url: impl Into<String>, data: &[u8], options: &UploadOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            url: url.into(),
            // Infallible on every platform we build for.
            size: u64::try_from(data.len()).unwrap_or(u64::MAX),
            content_type: options.content_type.clone(),
            content_hash: blake3::hash(data).to_string(),
            access: options.access,
            uploaded: UtcDateTime::now(),
        }
    }
}
