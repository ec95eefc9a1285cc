//! # Postwall
//!
//! Storage and image-derivative core for a public wall of uploaded pictures
//! and linked Instagram posts. It takes an uploaded image, derives a
//! thumbnail and a content-aware crop, lets a moderator re-crop it later, and
//! keeps the image files and the metadata record consistent with each other.
//!
//! # Architecture: Two Stores, One Writer
//!
//! ```text
//! upload bytes ─▶ ingest ─┬─▶ ArtifactStore      <data>/pictures/<id>/*.jpg
//!                         └─▶ MetadataRepository <data>/data.db (redb)
//! ```
//!
//! Files and records live in different stores, so there is no shared
//! transaction. The pipelines impose an order instead: files first, record
//! last, and on failure the record's directory is deleted before the error is
//! returned. A committed record therefore never names a file that does not
//! exist.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`library`] | The [`Library`] service object: stores, backend, diagnostics |
//! | [`ingest`] | Picture ingestion, re-crop and mutations |
//! | [`social`] | Linked posts: URL normalisation, oEmbed fetch, mutations |
//! | [`feed`] | Read-only views and the tagged [`feed::PostDto`] |
//! | [`imaging`] | Pure-Rust decode, encode, thumbnail, crop and saliency search |
//! | [`artifacts`] | Per-record directories with atomic file writes |
//! | [`repository`] | redb tables keyed by record id, JSON values |
//! | [`config`] | `config.toml` loading, environment overrides, validation |
//! | [`diagnostics`] | Sink for failures the pipelines recover from |
//! | [`error`] | Pipeline error and its [`ErrorKind`] classification |
//! | [`types`] | Record types shared by all of the above |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Best-Effort Top Crop
//!
//! The automatic crop is a suggestion. When the saliency search fails the
//! picture is still ingested with an empty `top_crop`, and the failure goes to
//! the [`diagnostics::Diagnostics`] sink rather than to the caller.
//!
//! ## Clamping Instead of Rejecting
//!
//! A requested crop is never rejected for lying partly outside the image. It
//! is capped to the image size and shifted back inside, see
//! [`imaging::clamp_crop_rect`]. A crop that ends up empty, or covering the
//! whole image, switches the record back to the original.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) for
//! everything, including the saliency search. No system libraries are needed.

pub mod artifacts;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod feed;
pub mod imaging;
pub mod ingest;
pub mod library;
pub mod output;
pub mod repository;
pub mod social;
pub mod types;

pub use error::{Error, ErrorKind};
pub use library::Library;

#[cfg(test)]
pub(crate) mod test_helpers;
