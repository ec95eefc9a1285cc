//! The service object every pipeline runs on.
//!
//! A [`Library`] owns the metadata repository, both artifact roots, the
//! image backend and the diagnostics sink. It is opened once at startup,
//! shared by reference (it is `Sync` when the backend is), and closes the
//! database when dropped.
//!
//! The pipelines themselves live next to the data they manage:
//! [`ingest`](crate::ingest) for pictures, [`social`](crate::social) for
//! linked posts and [`feed`](crate::feed) for the read-only views.

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::Result;
use crate::imaging::{DerivativeConfig, ImageBackend, RustBackend};
use crate::repository::MetadataRepository;
use std::fs;
use std::sync::Arc;
use uuid::Uuid;

/// URL prefix under which picture artifacts are served.
pub const PICTURES_URL_PREFIX: &str = "/pictures";
/// URL prefix under which social-post artifacts are served.
pub const POSTS_URL_PREFIX: &str = "/instagram";

pub struct Library<B: ImageBackend = RustBackend> {
    pub(crate) repo: MetadataRepository,
    pub(crate) pictures: ArtifactStore,
    pub(crate) posts: ArtifactStore,
    pub(crate) backend: B,
    pub(crate) derivatives: DerivativeConfig,
    pub(crate) max_upload_bytes: u64,
    pub(crate) diagnostics: Arc<dyn Diagnostics>,
}

impl Library<RustBackend> {
    /// Open the library described by `config` with the production backend,
    /// logging recovered failures through `tracing`.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_backend(config, RustBackend::new(), Arc::new(TracingDiagnostics))
    }
}

impl<B: ImageBackend> Library<B> {
    pub fn with_backend(
        config: &Config,
        backend: B,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self> {
        let storage = &config.storage;
        let pictures = ArtifactStore::open(storage.pictures_dir(), PICTURES_URL_PREFIX)?;
        let posts = ArtifactStore::open(storage.posts_dir(), POSTS_URL_PREFIX)?;

        let db_path = storage.db_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let repo = MetadataRepository::open(&db_path, diagnostics.clone())?;

        tracing::debug!(
            db = %db_path.display(),
            pictures = %pictures.root().display(),
            posts = %posts.root().display(),
            "library opened"
        );

        Ok(Self {
            repo,
            pictures,
            posts,
            backend,
            derivatives: config.derivatives(),
            max_upload_bytes: config.upload.max_bytes,
            diagnostics,
        })
    }

    pub fn repository(&self) -> &MetadataRepository {
        &self.repo
    }

    /// Artifact root for uploaded pictures.
    pub fn pictures(&self) -> &ArtifactStore {
        &self.pictures
    }

    /// Artifact root for linked social posts.
    pub fn posts(&self) -> &ArtifactStore {
        &self.posts
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Remove the directory of a record whose creation failed.
    ///
    /// Runs on an error path, so a failure here is reported rather than
    /// returned: the caller surfaces the original error.
    pub(crate) fn rollback(&self, store: &ArtifactStore, id: Uuid) {
        tracing::debug!(%id, "rolling back artifact directory");
        if let Err(e) = store.delete_record_dir(id) {
            self.diagnostics.cleanup_failed(&store.record_dir(id), &e);
        }
    }
}
