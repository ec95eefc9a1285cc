//! Parameter types for image operations.
//!
//! - [`Quality`]: JPEG encoding quality (1-100, default 100). Clamped on construction.
//! - [`PictureFormat`]: the two accepted container formats and their
//!   fixed artifact file names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Container format of an accepted upload. Derivatives are always encoded
/// in the same format as the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureFormat {
    Png,
    Jpeg,
}

impl PictureFormat {
    /// Parse a detected format tag (`"png"`, `"jpeg"`, `"jpg"`), case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Parse an upload MIME type (`image/png`, `image/jpeg`, `image/jpg`).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let lower = mime.trim().to_ascii_lowercase();
        lower.strip_prefix("image/").and_then(Self::from_tag)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn original_name(self) -> String {
        format!("orig.{}", self.extension())
    }

    pub fn thumbnail_name(self) -> String {
        format!("thumb.{}", self.extension())
    }

    pub fn crop_name(self) -> String {
        format!("crop.{}", self.extension())
    }

    pub fn thumb_crop_name(self) -> String {
        format!("thumb_crop.{}", self.extension())
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for PictureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => f.write_str("png"),
            Self::Jpeg => f.write_str("jpeg"),
        }
    }
}
