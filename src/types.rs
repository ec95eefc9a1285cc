//! Record types shared by the stores, the pipelines and the views.
//!
//! Both record kinds are serialized to JSON by the
//! [`repository`](crate::repository) and are never partially written: a
//! pipeline builds the whole value, then commits it in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uploader recorded when the caller has no identity to offer.
pub const ANONYMOUS_UPLOADER: &str = "anonymous";

/// Axis-aligned rectangle in pixel space of the original image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A crop rectangle as requested by a user. The origin may be negative,
/// which asks for the rectangle to be shifted back into the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRequest {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl CropRequest {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<Rect> for CropRequest {
    fn from(r: Rect) -> Self {
        Self::new(r.x as i64, r.y as i64, r.width as i64, r.height as i64)
    }
}

/// Free-text title and body shown with a picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub title: String,
    pub text: String,
}

/// An uploaded picture and the derivatives generated from it.
///
/// Path fields are file names relative to the record's artifact directory.
/// Empty strings mean "not generated yet"; a non-empty path always names a
/// file that exists in the picture artifact store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureRecord {
    pub id: Uuid,
    #[serde(default)]
    pub content: Content,
    pub original_bounds: Rect,
    #[serde(default)]
    pub cropped_bounds: Rect,
    #[serde(default)]
    pub top_crop: Rect,
    pub original_path: String,
    pub thumbnail_path: String,
    #[serde(default)]
    pub cropped_path: String,
    #[serde(default)]
    pub thumb_cropped_path: String,
    #[serde(default)]
    pub use_cropped: bool,
    #[serde(default)]
    pub disabled: bool,
    pub uploaded: DateTime<Utc>,
    pub edited: DateTime<Utc>,
    #[serde(default)]
    pub uploaded_filename: String,
    #[serde(default)]
    pub uploader: String,
}

impl PictureRecord {
    /// A freshly ingested picture: no crop, enabled, uploaded and edited now.
    pub fn new(
        id: Uuid,
        content: Content,
        original_bounds: Rect,
        original_path: impl Into<String>,
        thumbnail_path: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            content,
            original_bounds,
            cropped_bounds: Rect::default(),
            top_crop: Rect::default(),
            original_path: original_path.into(),
            thumbnail_path: thumbnail_path.into(),
            cropped_path: String::new(),
            thumb_cropped_path: String::new(),
            use_cropped: false,
            disabled: false,
            uploaded: now,
            edited: now,
            uploaded_filename: String::new(),
            uploader: ANONYMOUS_UPLOADER.to_string(),
        }
    }

    /// Bounds of whichever variant the feed should render.
    pub fn active_bounds(&self) -> Rect {
        if self.use_cropped {
            self.cropped_bounds
        } else {
            self.original_bounds
        }
    }

    /// Every artifact file name this record currently references.
    pub fn artifact_paths(&self) -> Vec<&str> {
        [
            self.original_path.as_str(),
            self.thumbnail_path.as_str(),
            self.cropped_path.as_str(),
            self.thumb_cropped_path.as_str(),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect()
    }
}

/// oEmbed payload returned by the post provider.
///
/// Stored verbatim; only `thumbnail_url` is interpreted by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedData {
    pub version: String,
    pub author_name: String,
    pub provider_name: String,
    pub provider_url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub width: Option<u32>,
    pub html: String,
    pub thumbnail_url: String,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
}

/// A linked social-media post with a locally stored thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPostRecord {
    pub id: Uuid,
    #[serde(default)]
    pub disabled: bool,
    pub post_url: String,
    pub thumbnail_path: String,
    pub thumbnail_bounds: Rect,
    pub uploaded: DateTime<Utc>,
    pub edited: DateTime<Utc>,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub data: EmbedData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_itself() {
        let r = Rect::new(10, 20, 30, 40);
        assert!(r.contains(&r));
    }

    #[test]
    fn rect_does_not_contain_overflowing_rect() {
        let bounds = Rect::from_size(100, 100);
        assert!(!bounds.contains(&Rect::new(50, 0, 51, 10)));
        assert!(!bounds.contains(&Rect::new(0, 99, 1, 2)));
    }

    #[test]
    fn rect_empty_on_either_axis() {
        assert!(Rect::new(0, 0, 0, 10).is_empty());
        assert!(Rect::new(0, 0, 10, 0).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn embed_data_decodes_sparse_payload() {
        let json = r#"{"type": "rich", "html": "<blockquote></blockquote>"}"#;
        let data: EmbedData = serde_json::from_str(json).unwrap();
        assert_eq!(data.kind, "rich");
        assert_eq!(data.thumbnail_width, None);
        assert!(data.thumbnail_url.is_empty());
    }

    #[test]
    fn active_bounds_follows_use_cropped() {
        let now = Utc::now();
        let mut record = PictureRecord {
            id: Uuid::new_v4(),
            content: Content::default(),
            original_bounds: Rect::from_size(200, 100),
            cropped_bounds: Rect::new(10, 10, 50, 40),
            top_crop: Rect::default(),
            original_path: "orig.png".into(),
            thumbnail_path: "thumb.png".into(),
            cropped_path: "crop.png".into(),
            thumb_cropped_path: "thumb_crop.png".into(),
            use_cropped: false,
            disabled: false,
            uploaded: now,
            edited: now,
            uploaded_filename: String::new(),
            uploader: ANONYMOUS_UPLOADER.into(),
        };
        assert_eq!(record.active_bounds(), Rect::from_size(200, 100));
        record.use_cropped = true;
        assert_eq!(record.active_bounds(), Rect::new(10, 10, 50, 40));
        assert_eq!(record.artifact_paths().len(), 4);
    }
}
