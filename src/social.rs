//! Linked social posts.
//!
//! A post is linked by URL. The embed metadata and the thumbnail come from
//! an [`EmbedProvider`]; in production that is [`OEmbedClient`], which
//! talks to the Instagram oEmbed API. The thumbnail is stored locally so
//! the feed never hot-links it.
//!
//! ```text
//! normalize URL → fetch embed → fetch thumbnail → decode
//!               → create <id>/ → thumb.<ext> → commit record
//! ```
//!
//! As with pictures, the record directory is removed if anything fails
//! after it was created.

use crate::config::EmbedConfig;
use crate::error::Result;
use crate::imaging::ImageBackend;
use crate::imaging::operations::encode_image;
use crate::library::Library;
use crate::types::{ANONYMOUS_UPLOADER, EmbedData, SocialPostRecord};
use chrono::Utc;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use std::io::Read;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

static POST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://(?:www\.)?instagram\.com/[\w.]+/[\w-]+)(?:[/?#].*)?$")
        .expect("post URL pattern is valid")
});

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("not an Instagram post URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("embed data has no thumbnail URL")]
    MissingThumbnail,
    #[error("thumbnail exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("reading response body failed: {0}")]
    Body(#[source] std::io::Error),
}

/// Reduce a user-supplied post link to `<scheme>://<host>/<user>/<post>`.
///
/// # Examples
/// ```
/// # use postwall::social::normalize_post_url;
/// let url = normalize_post_url("https://www.instagram.com/someone/CK3abc/?igshid=xyz").unwrap();
/// assert_eq!(url, "https://www.instagram.com/someone/CK3abc");
/// ```
pub fn normalize_post_url(url: &str) -> std::result::Result<String, FetchError> {
    POST_URL
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))
}

/// Some payloads carry the ampersands of the thumbnail URL as a literal
/// `\u0026` escape even after JSON decoding.
pub fn unescape_thumbnail_url(url: &str) -> String {
    url.replace("\\u0026", "&")
}

/// Read at most `limit` bytes of a response body.
///
/// A declared length over the limit is refused before anything is read;
/// a body that turns out longer than declared is cut off at `limit + 1`
/// bytes and refused too.
pub fn read_capped(
    body: impl Read,
    declared_len: Option<u64>,
    limit: u64,
) -> std::result::Result<Vec<u8>, FetchError> {
    if declared_len.is_some_and(|len| len > limit) {
        return Err(FetchError::TooLarge { limit });
    }
    let mut bytes = Vec::new();
    body.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(FetchError::Body)?;
    if bytes.len() as u64 > limit {
        return Err(FetchError::TooLarge { limit });
    }
    Ok(bytes)
}

/// Source of embed metadata and thumbnail bytes for linked posts.
pub trait EmbedProvider: Send + Sync {
    fn fetch_embed(&self, post_url: &str) -> std::result::Result<EmbedData, FetchError>;

    fn fetch_thumbnail(&self, thumbnail_url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// oEmbed API client.
#[derive(Debug, Clone)]
pub struct OEmbedClient {
    client: Client,
    endpoint: String,
    access_token: String,
    max_thumbnail_bytes: u64,
}

impl OEmbedClient {
    /// Thumbnails larger than `max_thumbnail_bytes` are refused, the same
    /// cap that applies to uploads.
    pub fn new(
        config: &EmbedConfig,
        max_thumbnail_bytes: u64,
    ) -> std::result::Result<Self, FetchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
            max_thumbnail_bytes,
        })
    }

    fn check(response: Response) -> std::result::Result<Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        error!(status = %status, body = %message, "embed provider returned error");
        Err(FetchError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl EmbedProvider for OEmbedClient {
    fn fetch_embed(&self, post_url: &str) -> std::result::Result<EmbedData, FetchError> {
        debug!(%post_url, "requesting embed data");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", post_url)])
            .bearer_auth(&self.access_token)
            .send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn fetch_thumbnail(&self, thumbnail_url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        debug!(%thumbnail_url, "downloading thumbnail");
        let response = Self::check(self.client.get(thumbnail_url).send()?)?;
        let declared_len = response.content_length();
        read_capped(response, declared_len, self.max_thumbnail_bytes)
    }
}

impl<B: ImageBackend> Library<B> {
    /// Link a post: fetch its embed data and thumbnail, store the
    /// thumbnail and commit the record.
    pub fn ingest_social_post(
        &self,
        provider: &dyn EmbedProvider,
        url: &str,
        uploader: Option<&str>,
    ) -> Result<SocialPostRecord> {
        let post_url = normalize_post_url(url)?;

        let mut data = provider.fetch_embed(&post_url)?;
        data.thumbnail_url = unescape_thumbnail_url(&data.thumbnail_url);
        if data.thumbnail_url.is_empty() {
            return Err(FetchError::MissingThumbnail.into());
        }
        let bytes = provider.fetch_thumbnail(&data.thumbnail_url)?;
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_upload_bytes,
            }
            .into());
        }
        let decoded = self.backend.decode(&bytes)?;

        let id = Uuid::new_v4();
        self.posts.create_record_dir(id)?;

        let result = (|| -> Result<SocialPostRecord> {
            let format = decoded.format;
            let thumbnail_name = format.thumbnail_name();
            let encoded = encode_image(&self.backend, &decoded.image, format, &self.derivatives)?;
            self.posts.write_image(id, &thumbnail_name, &encoded)?;

            let now = Utc::now();
            let record = SocialPostRecord {
                id,
                disabled: false,
                post_url: post_url.clone(),
                thumbnail_path: thumbnail_name,
                thumbnail_bounds: decoded.bounds(),
                uploaded: now,
                edited: now,
                uploader: uploader
                    .filter(|u| !u.trim().is_empty())
                    .unwrap_or(ANONYMOUS_UPLOADER)
                    .to_string(),
                data,
            };
            self.repo.put(&record)?;
            Ok(record)
        })();

        match result {
            Ok(record) => {
                tracing::info!(%id, post_url = %record.post_url, "social post linked");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "linking social post failed");
                self.rollback(&self.posts, id);
                Err(e)
            }
        }
    }

    /// Hide or show a linked post.
    pub fn set_post_disabled(&self, id: Uuid, disabled: bool) -> Result<SocialPostRecord> {
        let mut record: SocialPostRecord = self.repo.get(id)?;
        record.disabled = disabled;
        record.edited = Utc::now();
        self.repo.put(&record)?;
        tracing::info!(%id, disabled, "post visibility changed");
        Ok(record)
    }

    /// Delete a linked post and its stored thumbnail.
    pub fn delete_post(&self, id: Uuid) -> Result<()> {
        let _: SocialPostRecord = self.repo.get(id)?;
        self.repo.delete::<SocialPostRecord>(id)?;
        self.posts.delete_record_dir(id)?;
        tracing::info!(%id, "post deleted");
        Ok(())
    }

    pub fn get_post(&self, id: Uuid) -> Result<SocialPostRecord> {
        Ok(self.repo.get(id)?)
    }

    /// All linked posts, most recently linked first.
    pub fn list_posts(&self) -> Result<Vec<SocialPostRecord>> {
        let mut records: Vec<SocialPostRecord> = self.repo.list_all()?;
        records.sort_by(|a, b| b.uploaded.cmp(&a.uploaded));
        Ok(records)
    }
}
