//! Best-effort image recompression.
//!
//! This crate shrinks images before they are uploaded, providing:
//!
//! - **Content type detection** from file extensions ([`mime_from_path`]) or
//!   magic bytes ([`mime_from_magic_bytes`])
//! - **Recompression** to JPEG within a byte budget and a maximum edge length
//!   ([`ImageCompressor::compress`])
//!
//! Decoding supports BMP, GIF, JPEG, PNG, TIFF and WebP. Output is always
//! baseline JPEG; transparency is flattened.

pub mod error;
mod mime;
mod ops;

pub use crate::mime::{DEFAULT_MIME_TYPE, JPEG_MIME_TYPE, is_image, mime_from_magic_bytes, mime_from_path};
pub use crate::ops::{CompressOptions, ImageCompressor};

/// Bytes in a megabyte, as used for every size budget in this workspace.
pub const BYTES_PER_MB: u64 = 1_048_576;
