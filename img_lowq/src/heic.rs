//! HEIC/HEIF support via libheif-rs.
//!
//! Decoding goes through an intermediate JPEG buffer; everything downstream
//! (dimensions, resizing, re-encoding) works from that buffer.

use crate::codec;
use crate::resize::Dimensions;
use image::{DynamicImage, ImageFormat, RgbImage};
use libheif_rs::{
    Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
    RgbChroma,
};
use shared_utils::{LowqError, Result};
use tracing::{debug, warn};

/// Quality of the intermediate JPEG the HEIC source is decoded into.
pub const INTERMEDIATE_QUALITY: u8 = 95;

/// Quality of the full-size WebP made from a HEIC source.
pub const HIGH_QUALITY: u8 = 90;

/// Assumed size when the intermediate's header cannot be read.
pub const FALLBACK_DIMENSIONS: Dimensions = Dimensions::new(3000, 2000);

const HEIC_QUALITY_BOOST: u8 = 10;

fn heic_err(context: &str) -> impl Fn(libheif_rs::HeifError) -> LowqError + '_ {
    move |e| LowqError::Heic(format!("{}: {}", context, e))
}

/// Re-encoding to HEIC after a JPEG round trip loses more than writing JPEG
/// directly, so HEIC output gets a higher quality than requested.
pub fn boosted_quality(quality: u8) -> u8 {
    quality.saturating_add(HEIC_QUALITY_BOOST).min(100)
}

/// Decode the primary image of a HEIC container to an RGB JPEG buffer.
pub fn decode_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let lib_heif = LibHeif::new();

    let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| {
        let message = e.to_string();
        if message.contains("SecurityLimitExceeded") || message.contains("ipco") {
            LowqError::Heic(format!("HEIC security limit exceeded: {}", message))
        } else {
            LowqError::Heic(format!("Failed to read HEIC: {}", message))
        }
    })?;

    let handle = ctx
        .primary_image_handle()
        .map_err(heic_err("Failed to get primary image"))?;
    let width = handle.width();
    let height = handle.height();

    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(heic_err("Failed to decode HEIC"))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| LowqError::Heic("No RGB plane found".to_string()))?;

    // Rows may be padded to `stride`
    let row_len = width as usize * 3;
    if plane.stride < row_len {
        return Err(LowqError::Heic(format!(
            "RGB plane stride {} shorter than row {}",
            plane.stride, row_len
        )));
    }
    let mut rgb = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let row = row
            .get(..row_len)
            .ok_or_else(|| LowqError::Heic("Truncated RGB plane".to_string()))?;
        rgb.extend_from_slice(row);
    }

    let image = RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| LowqError::Heic("Failed to create RGB image".to_string()))?;

    debug!(width, height, quality, "HEIC decoded to intermediate JPEG");
    codec::encode_jpeg(&image, quality)
}

/// Dimensions of the intermediate JPEG, or [`FALLBACK_DIMENSIONS`].
pub fn intermediate_dimensions(jpeg: &[u8]) -> Dimensions {
    match codec::probe_dimensions(jpeg, ImageFormat::Jpeg) {
        Ok(dimensions) => dimensions,
        Err(e) => {
            warn!(error = %e, fallback = %FALLBACK_DIMENSIONS, "Could not read intermediate dimensions");
            FALLBACK_DIMENSIONS
        }
    }
}

/// Encode to HEIC (HEVC) at exactly `quality`.
pub fn encode(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut heif_image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb))
        .map_err(heic_err("Failed to create HEIF image"))?;
    heif_image
        .create_plane(Channel::Interleaved, width, height, 8)
        .map_err(heic_err("Failed to create RGB plane"))?;

    {
        let planes = heif_image.planes_mut();
        let plane = planes
            .interleaved
            .ok_or_else(|| LowqError::Heic("No RGB plane to fill".to_string()))?;
        let stride = plane.stride;
        let row_len = width as usize * 3;
        for (y, src_row) in rgb.as_raw().chunks_exact(row_len).enumerate() {
            let start = y * stride;
            plane.data[start..start + row_len].copy_from_slice(src_row);
        }
    }

    let lib_heif = LibHeif::new();
    let mut encoder = lib_heif
        .encoder_for_format(CompressionFormat::Hevc)
        .map_err(heic_err("No HEVC encoder available"))?;
    encoder
        .set_quality(EncoderQuality::Lossy(quality))
        .map_err(heic_err("Failed to set encoder quality"))?;

    let mut ctx = HeifContext::new().map_err(heic_err("Failed to create HEIF context"))?;
    ctx.encode_image(&heif_image, &mut encoder, None)
        .map_err(heic_err("Failed to encode HEIC"))?;
    ctx.write_to_bytes()
        .map_err(heic_err("Failed to serialise HEIC"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boosted_quality_caps_at_100() {
        assert_eq!(boosted_quality(40), 50);
        assert_eq!(boosted_quality(90), 100);
        assert_eq!(boosted_quality(95), 100);
        assert_eq!(boosted_quality(255), 100);
    }

    #[test]
    fn test_intermediate_dimensions_fallback() {
        assert_eq!(intermediate_dimensions(b"garbage"), FALLBACK_DIMENSIONS);
    }

    #[test]
    fn test_intermediate_dimensions_from_header() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 30));
        let jpeg = codec::encode_jpeg(&image, INTERMEDIATE_QUALITY).unwrap();
        assert_eq!(intermediate_dimensions(&jpeg), Dimensions::new(40, 30));
    }

    #[test]
    fn test_decode_real_heic_to_jpeg() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(320, 240, |x, y| {
            image::Rgb([x as u8, y as u8, 128])
        }));
        let heic = match encode(&image, 80) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("no HEVC encoder ({}), skipping", e);
                return;
            }
        };
        assert_eq!(&heic[4..8], b"ftyp");

        let jpeg = decode_to_jpeg(&heic, INTERMEDIATE_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFFu8, 0xD8]);
        assert_eq!(intermediate_dimensions(&jpeg), Dimensions::new(320, 240));
    }

    #[test]
    fn test_decode_rejects_non_heic() {
        let err = decode_to_jpeg(b"\x00\x00\x00\x18ftypjunk", INTERMEDIATE_QUALITY).unwrap_err();
        assert!(matches!(err, LowqError::Heic(_)));
    }
}
