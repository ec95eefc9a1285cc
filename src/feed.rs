//! Read-only views handed to the presentation layer.
//!
//! Two views exist:
//!
//! - [`feed_items`]: what the public wall shows. Enabled records only, each
//!   reduced to the URL and size of its active image. Ordering (the wall
//!   shuffles) is left to the caller.
//! - [`all_posts`]: the moderation list. Every record as a [`PostDto`],
//!   newest first.
//!
//! Both views combine the two collections. A collection that fails to load
//! is logged and left out so the other one still shows.
//!
//! DTOs are a closed enum tagged by `kind`:
//!
//! ```json
//! {"kind": "picture", "id": "…", "url": "/pictures/<id>/crop.jpg", …}
//! {"kind": "social_post", "id": "…", "post_url": "https://…", …}
//! ```

use crate::artifacts::ArtifactStore;
use crate::error::Result;
use crate::imaging::ImageBackend;
use crate::library::Library;
use crate::types::{PictureRecord, Rect, SocialPostRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A picture as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PictureDto {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    /// Active variant: the crop when `use_cropped`, else the original.
    pub url: String,
    pub thumbnail_url: String,
    pub original_url: String,
    pub width: u32,
    pub height: u32,
    pub use_cropped: bool,
    pub disabled: bool,
    pub original_bounds: Rect,
    pub cropped_bounds: Rect,
    pub top_crop: Rect,
    pub uploader: String,
    pub uploaded: DateTime<Utc>,
    pub edited: DateTime<Utc>,
}

impl PictureDto {
    pub fn from_record(record: &PictureRecord, store: &ArtifactStore) -> Self {
        let (image, thumbnail) = if record.use_cropped {
            (&record.cropped_path, &record.thumb_cropped_path)
        } else {
            (&record.original_path, &record.thumbnail_path)
        };
        let bounds = record.active_bounds();
        Self {
            id: record.id,
            title: record.content.title.clone(),
            text: record.content.text.clone(),
            url: store.public_url(record.id, image),
            thumbnail_url: store.public_url(record.id, thumbnail),
            original_url: store.public_url(record.id, &record.original_path),
            width: bounds.width,
            height: bounds.height,
            use_cropped: record.use_cropped,
            disabled: record.disabled,
            original_bounds: record.original_bounds,
            cropped_bounds: record.cropped_bounds,
            top_crop: record.top_crop,
            uploader: record.uploader.clone(),
            uploaded: record.uploaded,
            edited: record.edited,
        }
    }
}

/// A linked post as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialPostDto {
    pub id: Uuid,
    pub post_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub disabled: bool,
    pub embed_type: String,
    pub html: String,
    pub author_name: String,
    pub uploader: String,
    pub uploaded: DateTime<Utc>,
    pub edited: DateTime<Utc>,
}

impl SocialPostDto {
    pub fn from_record(record: &SocialPostRecord, store: &ArtifactStore) -> Self {
        Self {
            id: record.id,
            post_url: record.post_url.clone(),
            thumbnail_url: store.public_url(record.id, &record.thumbnail_path),
            width: record.thumbnail_bounds.width,
            height: record.thumbnail_bounds.height,
            disabled: record.disabled,
            embed_type: record.data.kind.clone(),
            html: record.data.html.clone(),
            author_name: record.data.author_name.clone(),
            uploader: record.uploader.clone(),
            uploaded: record.uploaded,
            edited: record.edited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostDto {
    Picture(PictureDto),
    SocialPost(SocialPostDto),
}

impl PostDto {
    pub fn id(&self) -> Uuid {
        match self {
            PostDto::Picture(p) => p.id,
            PostDto::SocialPost(p) => p.id,
        }
    }

    pub fn uploaded(&self) -> DateTime<Utc> {
        match self {
            PostDto::Picture(p) => p.uploaded,
            PostDto::SocialPost(p) => p.uploaded,
        }
    }
}

/// One tile of the public wall.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem {
    Picture {
        id: Uuid,
        url: String,
        width: u32,
        height: u32,
        title: String,
        text: String,
    },
    SocialPost {
        id: Uuid,
        url: String,
        width: u32,
        height: u32,
        embed_type: String,
        html: String,
    },
}

impl FeedItem {
    pub fn id(&self) -> Uuid {
        match self {
            FeedItem::Picture { id, .. } | FeedItem::SocialPost { id, .. } => *id,
        }
    }
}

/// Load one collection, logging and dropping it on failure.
fn load_or_skip<T>(collection: &str, result: Result<Vec<T>>) -> Option<Vec<T>> {
    match result {
        Ok(records) => Some(records),
        Err(e) => {
            tracing::warn!(%collection, error = %e, "collection unavailable, leaving it out");
            None
        }
    }
}

/// Load both collections. Fails only when neither could be read.
fn load_both<B: ImageBackend>(
    library: &Library<B>,
) -> Result<(Vec<PictureRecord>, Vec<SocialPostRecord>)> {
    let pictures = library.list_pictures();
    let posts = library.list_posts();
    match (pictures, posts) {
        (Err(e), Err(_)) => Err(e),
        (pictures, posts) => Ok((
            load_or_skip("pictures", pictures).unwrap_or_default(),
            load_or_skip("instagram", posts).unwrap_or_default(),
        )),
    }
}

/// Enabled records of both kinds, pictures first, each newest first.
pub fn feed_items<B: ImageBackend>(library: &Library<B>) -> Result<Vec<FeedItem>> {
    let (pictures, posts) = load_both(library)?;

    let pictures = pictures.iter().filter(|r| !r.disabled).map(|r| {
        let dto = PictureDto::from_record(r, library.pictures());
        FeedItem::Picture {
            id: dto.id,
            url: dto.url,
            width: dto.width,
            height: dto.height,
            title: dto.title,
            text: dto.text,
        }
    });
    let posts = posts.iter().filter(|r| !r.disabled).map(|r| {
        let dto = SocialPostDto::from_record(r, library.posts());
        FeedItem::SocialPost {
            id: dto.id,
            url: dto.thumbnail_url,
            width: dto.width,
            height: dto.height,
            embed_type: dto.embed_type,
            html: dto.html,
        }
    });

    Ok(pictures.chain(posts).collect())
}

/// Every record of both kinds, newest first.
pub fn all_posts<B: ImageBackend>(library: &Library<B>) -> Result<Vec<PostDto>> {
    let (pictures, posts) = load_both(library)?;

    let mut all: Vec<PostDto> = pictures
        .iter()
        .map(|r| PostDto::Picture(PictureDto::from_record(r, library.pictures())))
        .chain(
            posts
                .iter()
                .map(|r| PostDto::SocialPost(SocialPostDto::from_record(r, library.posts()))),
        )
        .collect();
    all.sort_by(|a, b| b.uploaded().cmp(&a.uploaded()));
    Ok(all)
}
