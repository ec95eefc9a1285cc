//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five pixel operations the
//! pipelines need: decode, encode, thumbnail, crop and saliency crop.
//! Everything above it (the ingest and re-crop pipelines) is
//! backend-agnostic, which is what lets tests inject failures at a precise
//! step.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{PictureFormat, Quality};
use crate::types::Rect;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// A decoded upload together with the container format it arrived in.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: PictureFormat,
}

impl DecodedImage {
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.image.width(), self.image.height())
    }
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Decode PNG or JPEG bytes. Any other container is
    /// [`BackendError::UnsupportedFormat`].
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Encode an image in the given format.
    fn encode(
        &self,
        image: &DynamicImage,
        format: PictureFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;

    /// Downscale to fit inside a `max_edge` square (never upscales).
    fn thumbnail(&self, image: &DynamicImage, max_edge: u32) -> Result<DynamicImage, BackendError>;

    /// Copy out a sub-rectangle. `rect` must lie inside the image.
    fn crop(&self, image: &DynamicImage, rect: Rect) -> Result<DynamicImage, BackendError>;

    /// Pick the most salient `width`×`height` region of the image.
    fn saliency_crop(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<Rect, BackendError>;
}
