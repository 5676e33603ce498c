//! # Image Preprocessing Module
//!
//! Turns an arbitrary inbound photo into a fixed-size RGB JPEG ready to be sent
//! to the analysis service. Everything happens in memory, so concurrent
//! requests never share intermediate state.

use image::codecs::jpeg::JpegEncoder;
use image::io::Reader as ImageReader;
use log::{debug, info};
use std::io::Cursor;

use crate::config::PreprocessConfig;
use crate::errors::PreprocessError;

/// Fixed-dimension RGB image, encoded as JPEG
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Decode, convert to RGB, resize and re-encode an image
    ///
    /// # Errors
    ///
    /// - [`PreprocessError::TooLarge`] if the input exceeds `max_input_bytes`
    /// - [`PreprocessError::TooManyPixels`] if the header declares more than `max_pixels`
    /// - [`PreprocessError::Decode`] if the bytes are not a readable image
    /// - [`PreprocessError::UnsupportedFormat`] if the format is known but cannot be decoded to RGB
    pub fn normalize(&self, photo_bytes: &[u8]) -> Result<NormalizedImage, PreprocessError> {
        let size = photo_bytes.len() as u64;
        if size > self.config.max_input_bytes {
            return Err(PreprocessError::TooLarge {
                size,
                max: self.config.max_input_bytes,
            });
        }

        // guess_format reports unknown signatures as "unsupported"; for us that is
        // simply not an image
        let format = image::guess_format(photo_bytes)
            .map_err(|e| PreprocessError::Decode(format!("unrecognized image data: {e}")))?;
        debug!("Detected image format {:?} ({} bytes)", format, size);

        // Decoded size is bounded by the dimensions, not by the compressed size
        let (source_width, source_height) =
            ImageReader::with_format(Cursor::new(photo_bytes), format).into_dimensions()?;
        if source_width == 0 || source_height == 0 {
            return Err(PreprocessError::Decode("image has no pixels".to_string()));
        }
        if u64::from(source_width) * u64::from(source_height) > self.config.max_pixels {
            return Err(PreprocessError::TooManyPixels {
                width: source_width,
                height: source_height,
                max_pixels: self.config.max_pixels,
            });
        }

        let decoded = image::load_from_memory_with_format(photo_bytes, format)?;

        let rgb = decoded.to_rgb8();
        let resized = image::imageops::resize(
            &rgb,
            self.config.target_width,
            self.config.target_height,
            self.config.filter,
        );

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality)
            .encode_image(&resized)
            .map_err(|e| PreprocessError::UnsupportedFormat(format!("failed to encode JPEG: {e}")))?;

        info!(
            "Normalized {:?} image {}x{} -> {}x{} ({} bytes)",
            format,
            source_width,
            source_height,
            resized.width(),
            resized.height(),
            jpeg.len()
        );

        Ok(NormalizedImage {
            width: resized.width(),
            height: resized.height(),
            jpeg,
        })
    }
}
