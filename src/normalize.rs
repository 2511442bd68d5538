//! Image normalization to the canonical store encoding
//!
//! Accepts PNG and JPEG input, detected from the byte stream itself, and
//! re-encodes to JPEG at fixed quality. PNG transparency is composited over
//! an opaque white background — the canonical format has no alpha channel,
//! and flattening is the deliberate tradeoff.

use crate::error::IngestError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Re-encode quality for canonical JPEG output
const JPEG_QUALITY: u8 = 100;

/// Decode an image and re-encode it as canonical JPEG bytes.
///
/// Pure function of the input bytes. Unknown or undecodable input fails
/// with [`IngestError::UnsupportedFormat`].
pub fn normalize_image(source: &[u8]) -> Result<Vec<u8>, IngestError> {
    let format = image::guess_format(source)
        .map_err(|_| IngestError::UnsupportedFormat("unrecognized image encoding".to_string()))?;

    let decoded = match format {
        ImageFormat::Png | ImageFormat::Jpeg => {
            image::load_from_memory_with_format(source, format)
                .map_err(|e| IngestError::UnsupportedFormat(e.to_string()))?
        }
        other => {
            return Err(IngestError::UnsupportedFormat(format!(
                "{other:?} input is not accepted"
            )));
        }
    };

    let flattened = flatten_onto_white(&decoded);

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&flattened)
        .map_err(|e| IngestError::Io(std::io::Error::other(e)))?;

    debug!(
        input = ?format,
        in_bytes = source.len(),
        out_bytes = out.len(),
        "Normalized image"
    );

    Ok(out)
}

/// Normalize and write the canonical bytes to a caller-specified location.
///
/// On failure nothing is written, so no partial file is ever left behind.
pub async fn write_normalized(source: &[u8], dest: &Path) -> Result<(), IngestError> {
    let canonical = normalize_image(source)?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(dest, canonical).await?;

    Ok(())
}

/// Flatten any alpha channel by compositing over opaque white.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    out
}
