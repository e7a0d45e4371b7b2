use image::ImageFormat;
use std::path::Path;

/// Content type used when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
/// Content type of everything [`ImageCompressor`](crate::ImageCompressor) produces.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Whether a content type describes an image the compressor should look at.
#[inline]
#[must_use]
pub fn is_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Detect a content type from a file extension.
///
/// Unknown or missing extensions yield [`DEFAULT_MIME_TYPE`].
#[must_use]
pub fn mime_from_path(path: impl AsRef<Path>) -> &'static str {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => JPEG_MIME_TYPE,
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "tif" | "tiff" => "image/tiff",
            "heic" => "image/heic",
            "avif" => "image/avif",
            "svg" => "image/svg+xml",
            "txt" => "text/plain",
            "md" => "text/markdown",
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "csv" => "text/csv",
            "js" => "text/javascript",
            "json" => "application/json",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "mp3" => "audio/mpeg",
            _ => DEFAULT_MIME_TYPE,
        })
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Detect an image content type from magic bytes.
///
/// Returns `None` if the bytes don't look like an image we can decode.
#[must_use]
pub fn mime_from_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some(JPEG_MIME_TYPE),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}
