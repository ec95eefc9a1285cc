//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::guess_format` + `image::load_from_memory_with_format` |
//! | Encode | `image::codecs::{jpeg::JpegEncoder, png::PngEncoder}` |
//! | Thumbnail | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Saliency crop | [`saliency::find_best_crop`](super::saliency::find_best_crop) |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::calculations::calculate_thumbnail_dimensions;
use super::params::{PictureFormat, Quality};
use super::saliency;
use crate::types::Rect;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let detected = image::guess_format(bytes)
            .map_err(|_| BackendError::UnsupportedFormat("unrecognised image data".into()))?;

        let format = match detected {
            ImageFormat::Png => PictureFormat::Png,
            ImageFormat::Jpeg => PictureFormat::Jpeg,
            other => {
                return Err(BackendError::UnsupportedFormat(format!("{other:?}")));
            }
        };

        let image = image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode {format}: {e}")))?;

        Ok(DecodedImage { image, format })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: PictureFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        match format {
            PictureFormat::Png => image
                .write_with_encoder(PngEncoder::new(&mut buf))
                .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?,
            PictureFormat::Jpeg => {
                // JPEG has no alpha channel and no 16-bit mode
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?
            }
        }
        Ok(buf)
    }

    fn thumbnail(&self, image: &DynamicImage, max_edge: u32) -> Result<DynamicImage, BackendError> {
        if max_edge == 0 {
            return Err(BackendError::ProcessingFailed(
                "thumbnail size must be non-zero".into(),
            ));
        }
        let source = (image.width(), image.height());
        let (w, h) = calculate_thumbnail_dimensions(source, max_edge);
        if (w, h) == source {
            return Ok(image.clone());
        }
        Ok(image.resize_exact(w, h, FilterType::Lanczos3))
    }

    fn crop(&self, image: &DynamicImage, rect: Rect) -> Result<DynamicImage, BackendError> {
        let bounds = Rect::from_size(image.width(), image.height());
        if rect.is_empty() || !bounds.contains(&rect) {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {rect:?} is empty or outside {}x{}",
                bounds.width, bounds.height
            )));
        }
        Ok(image.crop_imm(rect.x, rect.y, rect.width, rect.height))
    }

    fn saliency_crop(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<Rect, BackendError> {
        saliency::find_best_crop(image, width, height)
    }
}
