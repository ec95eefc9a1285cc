//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! configuration, compute parameters, call the backend and hand encoded
//! bytes back to the pipelines, which decide where the bytes are stored.

use super::backend::{BackendError, ImageBackend};
use super::calculations::target_ratio_fit;
use super::params::{PictureFormat, Quality};
use crate::types::Rect;
use image::DynamicImage;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Settings shared by every derivative the pipelines produce.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeConfig {
    /// Longest edge of generated thumbnails, in pixels.
    pub thumbnail_size: u32,
    /// Aspect ratio (w, h) of the automatic top crop.
    pub target_ratio: (u32, u32),
    pub quality: Quality,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 400,
            target_ratio: (4, 3),
            quality: Quality::default(),
        }
    }
}

/// Encoded crop and its thumbnail.
#[derive(Debug, Clone)]
pub struct CropVariant {
    pub crop: Vec<u8>,
    pub thumbnail: Vec<u8>,
}

/// Encode an image as-is.
pub fn encode_image(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: PictureFormat,
    config: &DerivativeConfig,
) -> Result<Vec<u8>> {
    backend.encode(image, format, config.quality)
}

/// Downscale to the configured thumbnail size and encode.
pub fn make_thumbnail(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: PictureFormat,
    config: &DerivativeConfig,
) -> Result<Vec<u8>> {
    let thumb = backend.thumbnail(image, config.thumbnail_size)?;
    backend.encode(&thumb, format, config.quality)
}

/// Plan the size of the automatic top crop without running it.
pub fn plan_top_crop(bounds: Rect, config: &DerivativeConfig) -> (u32, u32) {
    target_ratio_fit(bounds, config.target_ratio)
}

/// Run the saliency search for the configured target ratio.
pub fn find_top_crop(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    config: &DerivativeConfig,
) -> Result<Rect> {
    let bounds = Rect::from_size(image.width(), image.height());
    let (w, h) = plan_top_crop(bounds, config);
    backend.saliency_crop(image, w, h)
}

/// Cut `rect` out of the original, then encode it and a thumbnail of it.
///
/// `rect` must already be clamped to the original's bounds.
pub fn make_crop(
    backend: &impl ImageBackend,
    original: &DynamicImage,
    rect: Rect,
    format: PictureFormat,
    config: &DerivativeConfig,
) -> Result<CropVariant> {
    let cropped = backend.crop(original, rect)?;
    let crop = backend.encode(&cropped, format, config.quality)?;
    let thumbnail = make_thumbnail(backend, &cropped, format, config)?;
    Ok(CropVariant { crop, thumbnail })
}
