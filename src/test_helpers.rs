//! Shared test utilities for the postwall test suite.
//!
//! Provides synthetic images and an isolated [`Library`] rooted in a temp
//! directory, wired to a [`MockBackend`] and [`RecordingDiagnostics`] so tests
//! can inject failures and inspect what was reported.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let fixture = TestLibrary::new();
//! let record = fixture
//!     .library
//!     .ingest_picture(upload(PictureFormat::Png, 400, 300))
//!     .unwrap();
//! assert!(fixture.library.pictures().exists(record.id, "orig.png"));
//! ```

use std::sync::Arc;
use tempfile::TempDir;

use crate::config::Config;
use crate::diagnostics::RecordingDiagnostics;
use crate::imaging::backend::tests::{MockBackend, Op};
use crate::imaging::{ImageBackend, PictureFormat, Quality, RustBackend};
use crate::ingest::PictureUpload;
use crate::library::Library;
use crate::types::Content;
use image::{DynamicImage, Rgb, RgbImage};

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image with a horizontal/vertical colour gradient.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Encoded bytes of a [`gradient_image`].
pub fn encode_test_image(format: PictureFormat, width: u32, height: u32) -> Vec<u8> {
    RustBackend::new()
        .encode(&gradient_image(width, height), format, Quality::default())
        .unwrap()
}

/// An upload of a synthetic image with an empty title and text.
pub fn upload(format: PictureFormat, width: u32, height: u32) -> PictureUpload {
    PictureUpload {
        bytes: encode_test_image(format, width, height),
        filename: format!("test.{}", format.extension()),
        content_type: None,
        content: Content::default(),
        uploader: None,
    }
}

// =========================================================================
// Library fixture
// =========================================================================

/// Config rooted at `root`, otherwise stock.
pub fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = root.to_string_lossy().into_owned();
    config
}

/// A [`Library`] in its own temp directory.
pub struct TestLibrary {
    pub library: Library<MockBackend>,
    pub diagnostics: Arc<RecordingDiagnostics>,
    // Dropped last: removes everything the library wrote
    pub tmp: TempDir,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    /// Library whose backend fails the given operation.
    pub fn failing_on(op: Op) -> Self {
        Self::with_backend(MockBackend::failing_on(op))
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let tmp = TempDir::new().unwrap();
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let library =
            Library::with_backend(&test_config(tmp.path()), backend, diagnostics.clone()).unwrap();
        Self {
            library,
            diagnostics,
            tmp,
        }
    }

    /// Number of record directories under the pictures root.
    pub fn picture_dirs(&self) -> usize {
        std::fs::read_dir(self.library.pictures().root())
            .unwrap()
            .count()
    }

    /// Number of record directories under the posts root.
    pub fn post_dirs(&self) -> usize {
        std::fs::read_dir(self.library.posts().root())
            .unwrap()
            .count()
    }
}
