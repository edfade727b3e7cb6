//! Fast image decoding with format-specific optimizations.
//!
//! Uses zune-jpeg for JPEG data (1.5-2x faster than image crate),
//! falls back to image crate for other formats.

use crate::error::HashError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// JPEG start-of-image marker
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Image formats with a dedicated decode path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Other,
}

impl ImageFormat {
    /// Detect format from the content; file extensions are not trusted
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&JPEG_MAGIC) {
            Self::Jpeg
        } else {
            Self::Other
        }
    }
}

/// Fast image decoder that uses optimized decoders per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode image bytes read from `path`.
    ///
    /// - JPEG: Uses zune-jpeg, retrying with the image crate on failure
    /// - Other formats: image crate, format guessed from the content
    pub fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<DynamicImage, HashError> {
        if bytes.is_empty() {
            return Err(HashError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        match ImageFormat::detect(bytes) {
            ImageFormat::Jpeg => {
                Self::decode_jpeg(path, bytes).or_else(|_| Self::decode_fallback(path, bytes))
            }
            ImageFormat::Other => Self::decode_fallback(path, bytes),
        }
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(path: &Path, bytes: &[u8]) -> Result<DynamicImage, HashError> {
        // Configure decoder to output RGB
        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder.decode().map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "Failed to get image info".to_string(),
        })?;

        let width = info.width as u32;
        let height = info.height as u32;

        // Get actual output colorspace after decoding
        let out_colorspace = decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB);

        let buffer_error = |kind: &str| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("Failed to create {} buffer", kind),
        };

        let image = match out_colorspace {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("RGB"))?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("RGBA"))?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("Luma"))?;
                DynamicImage::ImageLuma8(buffer)
            }
            _ => {
                // Unsupported colorspace, fall back to image crate
                return Self::decode_fallback(path, bytes);
            }
        };

        Ok(image)
    }

    /// Fallback to image crate for non-JPEG formats
    fn decode_fallback(path: &Path, bytes: &[u8]) -> Result<DynamicImage, HashError> {
        image::load_from_memory(bytes).map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
