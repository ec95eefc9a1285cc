//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` (PNG and JPEG only) |
//! | **Thumbnail** | Lanczos3 downscale into a square |
//! | **Crop** | `crop_imm` on the decoded original |
//! | **Top crop** | built-in saliency search ([`saliency`]) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and thumbnail geometry (unit testable)
//! - **Parameters**: Format and quality types
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod saliency;

pub use backend::{BackendError, DecodedImage, ImageBackend};
pub use calculations::{
    calculate_thumbnail_dimensions, clamp_crop_rect, disable_crop_condition, target_ratio_fit,
};
pub use operations::{CropVariant, DerivativeConfig};
pub use params::{PictureFormat, Quality};
pub use rust_backend::RustBackend;
