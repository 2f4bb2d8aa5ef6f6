use crate::policy::{jpeg_quality, COMPRESSION_BOX};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageResult};
use linkdrop_core::CompressionInfo;
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Bytes to store for an image plus what happened to them.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub data: Vec<u8>,
    pub info: CompressionInfo,
}

/// Shrinks an uploaded image on the blocking pool.
///
/// Falls back to the original bytes when the format is not recompressed,
/// when re-encoding fails, or when the result is not smaller.
pub async fn compress_image(data: Vec<u8>, mimetype: String) -> Result<Compressed, JoinError> {
    tokio::task::spawn_blocking(move || compress(data, &mimetype)).await
}

pub fn compress(data: Vec<u8>, mimetype: &str) -> Compressed {
    let original_size = data.len() as u64;
    let keep = |data: Vec<u8>| Compressed {
        data,
        info: CompressionInfo::unchanged(original_size),
    };

    let format = match ImageFormat::from_mime_type(mimetype) {
        Some(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) => format,
        _ => return keep(data),
    };

    match reencode(&data, format, jpeg_quality(original_size)) {
        Ok(out) if (out.len() as u64) < original_size => {
            let info = CompressionInfo::shrunk(original_size, out.len() as u64);
            debug!(
                mimetype,
                original_size,
                compressed_size = info.compressed_size,
                "image recompressed"
            );
            Compressed { data: out, info }
        }
        Ok(_) => keep(data),
        Err(e) => {
            warn!(error = %e, mimetype, "image recompression failed, storing original");
            keep(data)
        }
    }
}

fn reencode(data: &[u8], format: ImageFormat, quality: u8) -> ImageResult<Vec<u8>> {
    let mut img = image::load_from_memory_with_format(data, format)?;
    if img.width() > COMPRESSION_BOX || img.height() > COMPRESSION_BOX {
        img = img.resize(COMPRESSION_BOX, COMPRESSION_BOX, FilterType::Lanczos3);
    }

    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
        }
        ImageFormat::Png => {
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))?;
        }
        _ => {
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            img.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        }
    }
    Ok(out)
}
