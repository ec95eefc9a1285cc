//! Service configuration module.
//!
//! Configuration is resolved in three layers: stock defaults, an optional
//! `config.toml`, then environment variables. The result is validated before
//! anything is opened.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! data_dir = "/data"        # Root for artifacts and the database (env: DATA)
//! db_file = "data.db"       # Database file, relative to data_dir (env: DB)
//!
//! [images]
//! thumbnail_size = 400      # Longest thumbnail edge in pixels
//! target_ratio = [4, 3]     # Aspect ratio of the automatic top crop
//! jpeg_quality = 100        # JPEG encoding quality (1-100)
//!
//! [upload]
//! max_bytes = 8388608       # Largest accepted upload payload
//!
//! [embed]
//! endpoint = "https://graph.facebook.com/v8.0/instagram_oembed"
//! access_token = ""         # Bearer token for the oEmbed API (env: INSTA_TOKEN)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DerivativeConfig, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `storage.data_dir`.
pub const ENV_DATA_DIR: &str = "DATA";
/// Environment variable overriding `storage.db_file`.
pub const ENV_DB_FILE: &str = "DB";
/// Environment variable overriding `embed.access_token`.
pub const ENV_ACCESS_TOKEN: &str = "INSTA_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where artifacts and the metadata database live.
    pub storage: StorageConfig,
    /// Derivative generation settings.
    pub images: ImagesConfig,
    /// Upload limits.
    pub upload: UploadConfig,
    /// Remote embed provider.
    pub embed: EmbedConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.data_dir must not be empty".into(),
            ));
        }
        if self.storage.db_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.db_file must not be empty".into(),
            ));
        }
        if self.images.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "images.thumbnail_size must be non-zero".into(),
            ));
        }
        if self.images.target_ratio[0] == 0 || self.images.target_ratio[1] == 0 {
            return Err(ConfigError::Validation(
                "images.target_ratio values must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "upload.max_bytes must be non-zero".into(),
            ));
        }
        if !self.embed.endpoint.starts_with("http://") && !self.embed.endpoint.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "embed.endpoint must be an http(s) URL".into(),
            ));
        }
        Ok(())
    }

    /// Override fields from environment variables.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.storage.data_dir = dir;
        }
        if let Some(db) = lookup(ENV_DB_FILE).filter(|v| !v.is_empty()) {
            self.storage.db_file = db;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.embed.access_token = token;
        }
    }

    /// Derivative settings handed to the image operations.
    pub fn derivatives(&self) -> DerivativeConfig {
        DerivativeConfig {
            thumbnail_size: self.images.thumbnail_size,
            target_ratio: (self.images.target_ratio[0], self.images.target_ratio[1]),
            quality: Quality::new(self.images.jpeg_quality),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for artifacts and the database. A leading `./` is
    /// ignored.
    pub data_dir: String,
    /// Database file name, resolved against `data_dir` unless absolute.
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "/data".to_string(),
            db_file: "data.db".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn data_root(&self) -> PathBuf {
        let dir = self.data_dir.strip_prefix("./").unwrap_or(&self.data_dir);
        PathBuf::from(dir)
    }

    /// Artifact root for uploaded pictures.
    pub fn pictures_dir(&self) -> PathBuf {
        self.data_root().join("pictures")
    }

    /// Artifact root for linked social posts.
    pub fn posts_dir(&self) -> PathBuf {
        self.data_root().join("instagram")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_root().join(&self.db_file)
    }
}

/// Derivative generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Longest edge of generated thumbnails, in pixels.
    pub thumbnail_size: u32,
    /// Aspect ratio as `[width, height]` of the automatic top crop.
    pub target_ratio: [u32; 2],
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub jpeg_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 400,
            target_ratio: [4, 3],
            jpeg_quality: 100,
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted upload, in bytes.
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_bytes: 32 << 18 }
    }
}

/// oEmbed provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedConfig {
    pub endpoint: String,
    pub access_token: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://graph.facebook.com/v8.0/instagram_oembed".to_string(),
            access_token: String::new(),
        }
    }
}

/// Parse a config file without environment overrides or validation.
pub fn load_raw_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Resolve the effective configuration.
///
/// Reads `path` when given, applies the process environment, then validates.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_raw_config(path)?,
        None => Config::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Postwall Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Environment variables override the file:
#   DATA        -> storage.data_dir
#   DB          -> storage.db_file
#   INSTA_TOKEN -> embed.access_token
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Root directory. Pictures go to <data_dir>/pictures, linked posts to
# <data_dir>/instagram.
data_dir = "/data"

# Metadata database file, relative to data_dir.
db_file = "data.db"

# ---------------------------------------------------------------------------
# Derivatives
# ---------------------------------------------------------------------------
[images]
# Longest edge of generated thumbnails, in pixels. Never upscales.
thumbnail_size = 400

# Aspect ratio as [width, height] of the automatic top crop.
target_ratio = [4, 3]

# JPEG encoding quality (1 = worst, 100 = best). PNG is lossless.
jpeg_quality = 100

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[upload]
# Largest accepted upload payload, in bytes.
max_bytes = 8388608

# ---------------------------------------------------------------------------
# Linked posts
# ---------------------------------------------------------------------------
[embed]
# oEmbed endpoint queried with ?url=<post url>.
endpoint = "https://graph.facebook.com/v8.0/instagram_oembed"

# Bearer token sent to the endpoint.
access_token = ""
"##
}
