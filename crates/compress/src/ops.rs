//! Image Recompression

use crate::BYTES_PER_MB;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::instrument;

const DEFAULT_MAX_DIMENSION: u32 = 1920;
const DEFAULT_INITIAL_QUALITY: u8 = 90;
/// Quality is lowered in these steps before resorting to downscaling.
const QUALITY_STEP: u8 = 10;
/// Below this, JPEG artifacts are worse than a smaller picture.
const MIN_QUALITY: u8 = 40;
/// Each downscaling pass keeps this fraction (numerator / 4) of each edge.
const SCALE_NUMERATOR: u32 = 3;
/// Downscaling stops once the longest edge would drop below this.
const MIN_DIMENSION: u32 = 64;

/// Targets for [`ImageCompressor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressOptions {
    /// Byte budget for the encoded output.
    pub max_size_bytes: u64,
    /// Longest permitted edge, in pixels.
    pub max_dimension: u32,
    /// JPEG quality of the first attempt (1-100).
    pub initial_quality: u8,
}
impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: BYTES_PER_MB,
            max_dimension: DEFAULT_MAX_DIMENSION,
            initial_quality: DEFAULT_INITIAL_QUALITY,
        }
    }
}

/// Recompresses images to JPEG within a byte budget.
///
/// The image is first shrunk so its longest edge fits `max_dimension`, then
/// encoded at decreasing qualities until it fits `max_size_bytes`. If even
/// the lowest quality is too large the picture is repeatedly downscaled. When
/// nothing fits, the smallest encoding found is returned.
///
/// # Examples
///
/// ```
/// use hoist_compress::{CompressOptions, ImageCompressor};
///
/// let compressor = ImageCompressor::new(CompressOptions::default()).unwrap();
/// // Garbage in, error out. Callers decide whether that's fatal.
/// assert!(compressor.compress(b"definitely not a PNG").is_err());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCompressor {
    options: CompressOptions,
}

impl ImageCompressor {
    pub fn new(options: CompressOptions) -> Result<Self> {
        if options.max_size_bytes == 0 {
            exn::bail!(ErrorKind::InvalidOptions("max_size_bytes must be greater than zero"));
        }
        if options.max_dimension == 0 {
            exn::bail!(ErrorKind::InvalidOptions("max_dimension must be greater than zero"));
        }
        if !(1..=100).contains(&options.initial_quality) {
            exn::bail!(ErrorKind::InvalidOptions("initial_quality must be between 1 and 100"));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &CompressOptions {
        &self.options
    }

    /// Decode `input`, fit it within the configured limits, and re-encode it
    /// as JPEG.
    #[instrument(skip(self, input), fields(input_size = input.len(), output_size))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(input).or_raise(|| ErrorKind::Decode)?;
        // JPEG has no alpha channel.
        let mut image = DynamicImage::ImageRgb8(self.fit(decoded).to_rgb8());

        let mut best = encode(&image, self.options.initial_quality)?;
        if !self.fits(&best) {
            for quality in self.qualities() {
                let attempt = encode(&image, quality)?;
                let fits = self.fits(&attempt);
                if attempt.len() < best.len() {
                    best = attempt;
                }
                if fits {
                    break;
                }
            }
        }
        while !self.fits(&best) {
            let (width, height) = image.dimensions();
            let (width, height) = (width * SCALE_NUMERATOR / 4, height * SCALE_NUMERATOR / 4);
            if width.max(height) < MIN_DIMENSION || width.min(height) == 0 {
                tracing::debug!(size = best.len(), "Could not reach target size; keeping smallest encoding");
                break;
            }
            image = image.resize_exact(width, height, FilterType::Triangle);
            let attempt = encode(&image, MIN_QUALITY)?;
            if attempt.len() < best.len() {
                best = attempt;
            }
        }
        tracing::Span::current().record("output_size", best.len());
        Ok(best)
    }

    /// Shrink (never enlarge) so the longest edge fits `max_dimension`.
    fn fit(&self, image: DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let max = self.options.max_dimension;
        if width <= max && height <= max {
            return image;
        }
        // `resize` preserves the aspect ratio within the bounding box.
        image.resize(max, max, FilterType::Lanczos3)
    }

    fn fits(&self, encoded: &[u8]) -> bool {
        u64::try_from(encoded.len()).is_ok_and(|len| len <= self.options.max_size_bytes)
    }

    /// Qualities to try after the initial one, highest first.
    fn qualities(&self) -> impl Iterator<Item = u8> {
        let start = self.options.initial_quality;
        (1..)
            .map(move |step: u8| start.saturating_sub(step.saturating_mul(QUALITY_STEP)))
            .take_while(|quality| *quality >= MIN_QUALITY)
    }
}

fn encode(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image.write_with_encoder(encoder).or_raise(|| ErrorKind::Encode)?;
    Ok(buffer)
}
