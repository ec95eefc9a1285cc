//! Filesystem storage for image artifacts.
//!
//! Every record owns one directory named after its id:
//!
//! ```text
//! <root>/<id>/orig.jpg
//!            /thumb.jpg
//!            /crop.jpg
//!            /thumb_crop.jpg
//! ```
//!
//! Pictures and social posts use separate roots, each served under its own
//! URL prefix (`/pictures`, `/instagram`).
//!
//! Writes go to a temp file inside the record directory and are renamed
//! into place, so a reader never observes a half-written image.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact directory for {0} already exists")]
    AlreadyExists(Uuid),
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid artifact file name: {0:?}")]
    InvalidName(String),
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One artifact root, e.g. `<data>/pictures`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    url_prefix: String,
}

impl ArtifactStore {
    /// Open (and create if needed) an artifact root.
    pub fn open(root: impl Into<PathBuf>, url_prefix: &str) -> Result<Self, ArtifactError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_at(&root))?;
        Ok(Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Create the directory of a new record. Fails with
    /// [`ArtifactError::AlreadyExists`] if it is already there.
    pub fn create_record_dir(&self, id: Uuid) -> Result<PathBuf, ArtifactError> {
        let dir = self.record_dir(id);
        match fs::create_dir(&dir) {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(ArtifactError::AlreadyExists(id))
            }
            Err(e) => Err(io_at(&dir)(e)),
        }
    }

    /// Write (or replace) `file_name` in the record directory.
    pub fn write_image(&self, id: Uuid, file_name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let target = self.file_path(id, file_name)?;
        let dir = self.record_dir(id);
        if !dir.is_dir() {
            return Err(ArtifactError::NotFound(dir));
        }

        let tmp = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(io_at(&target)(e));
        }
        Ok(())
    }

    pub fn read_image(&self, id: Uuid, file_name: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.file_path(id, file_name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ArtifactError::NotFound(path.clone()),
            _ => io_at(&path)(e),
        })
    }

    pub fn exists(&self, id: Uuid, file_name: &str) -> bool {
        self.file_path(id, file_name)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Remove a record directory and everything in it.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn delete_record_dir(&self, id: Uuid) -> Result<bool, ArtifactError> {
        let dir = self.record_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_at(&dir)(e)),
        }
    }

    /// Public URL of an artifact: `<prefix>/<id>/<file>`.
    pub fn public_url(&self, id: Uuid, file_name: &str) -> String {
        format!("{}/{id}/{file_name}", self.url_prefix)
    }

    /// Artifact names are plain file names; anything that could climb out of
    /// the record directory is refused.
    fn file_path(&self, id: Uuid, file_name: &str) -> Result<PathBuf, ArtifactError> {
        let plain = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\']);
        if !plain {
            return Err(ArtifactError::InvalidName(file_name.to_string()));
        }
        Ok(self.record_dir(id).join(file_name))
    }
}
