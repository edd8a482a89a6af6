//! Codec wrappers: decoding under limits, encoding per target format, and
//! writing results into place.

use crate::gate::TargetFormat;
use crate::resize::Dimensions;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Limits};
use shared_utils::{LowqError, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Process-wide codec state, fixed on first use.
///
/// All codecs run synchronously on the calling thread and keep no cache
/// between calls; the only tunables are the decoder limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSettings {
    /// Upper bound on a single decoder allocation, in bytes.
    pub max_alloc: u64,
    pub max_dimension: u32,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            max_alloc: 512 * 1024 * 1024,
            max_dimension: 32_768,
        }
    }
}

static SETTINGS: OnceLock<CodecSettings> = OnceLock::new();

/// One-time initialisation; call before traversal. Later calls return the
/// settings chosen by the first one.
pub fn init() -> &'static CodecSettings {
    SETTINGS.get_or_init(|| {
        let settings = CodecSettings::default();
        debug!(
            max_alloc = settings.max_alloc,
            max_dimension = settings.max_dimension,
            "Codec settings initialised"
        );
        settings
    })
}

fn limits() -> Limits {
    let settings = init();
    let mut limits = Limits::default();
    limits.max_alloc = Some(settings.max_alloc);
    limits.max_image_width = Some(settings.max_dimension);
    limits.max_image_height = Some(settings.max_dimension);
    limits
}

/// Quality as accepted by the encoders.
pub fn clamp_quality(raw: i64) -> u8 {
    raw.clamp(1, 100) as u8
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits());
    reader.decode().map_err(|e| LowqError::Decode(e.to_string()))
}

pub fn decode_as(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage> {
    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(limits());
    reader.decode().map_err(|e| LowqError::Decode(e.to_string()))
}

/// Dimensions from the header alone, without decoding pixels.
pub fn probe_dimensions(bytes: &[u8], format: ImageFormat) -> Result<Dimensions> {
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| LowqError::Decode(e.to_string()))?;
    Ok(Dimensions::new(width, height))
}

pub fn dimensions_of(image: &DynamicImage) -> Dimensions {
    let (width, height) = image.dimensions();
    Dimensions::new(width, height)
}

pub fn resized(image: &DynamicImage, target: Dimensions) -> DynamicImage {
    image.resize_exact(target.width, target.height, FilterType::Lanczos3)
}

pub fn encode(image: &DynamicImage, format: TargetFormat, quality: u8) -> Result<Vec<u8>> {
    match format {
        TargetFormat::Jpeg => encode_jpeg(image, quality),
        TargetFormat::Png => encode_png(image, quality),
        TargetFormat::Webp => encode_webp(image, quality),
        TargetFormat::Heic => crate::heic::encode(image, quality),
    }
}

pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| LowqError::encode("jpeg", e))?;
    Ok(buffer)
}

/// PNG is lossless, so quality only selects how hard the deflater works.
fn png_compression(quality: u8) -> CompressionType {
    match quality {
        0..=33 => CompressionType::Best,
        34..=66 => CompressionType::Default,
        _ => CompressionType::Fast,
    }
}

pub fn encode_png(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, png_compression(quality), PngFilter::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(|e| LowqError::encode("png", e))?;
    Ok(buffer)
}

/// libwebp refuses larger sides.
pub const WEBP_MAX_DIMENSION: u32 = 16_383;

/// Lossy WebP at `quality`.
pub fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
        return Err(LowqError::encode(
            "webp",
            format!(
                "{}x{} exceeds the {}px WebP limit",
                width, height, WEBP_MAX_DIMENSION
            ),
        ));
    }

    let prepared = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    let encoder =
        webp::Encoder::from_image(&prepared).map_err(|e| LowqError::encode("webp", e))?;
    // `encode` unwraps libwebp errors; `encode_simple` returns them
    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| LowqError::encode("webp", format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

/// Writes through a temporary sibling and links it into place. Fails rather
/// than replacing a file that appeared at `path` in the meantime.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_err = |source: std::io::Error| LowqError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".img_lowq-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist_noclobber(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
