//! Pipeline-level error type.
//!
//! Each store and the imaging backend have their own error enum. The
//! pipelines convert them into [`Error`], keeping the distinctions a caller
//! needs to pick a response: [`Error::kind`] collapses every failure onto
//! one of five [`ErrorKind`]s.

use crate::artifacts::ArtifactError;
use crate::imaging::BackendError;
use crate::repository::RepositoryError;
use crate::social::FetchError;
use thiserror::Error;

/// Closed classification of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    UnsupportedFormat,
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("image processing failed: {0}")]
    Imaging(#[source] BackendError),
    #[error("artifact storage failed: {0}")]
    Artifact(#[source] ArtifactError),
    #[error("metadata store failed: {0}")]
    Repository(#[source] RepositoryError),
    #[error("remote fetch failed: {0}")]
    Fetch(#[source] FetchError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Imaging(_) | Error::Artifact(_) | Error::Repository(_) | Error::Fetch(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::UnsupportedFormat(format) => Error::UnsupportedFormat(format),
            other => Error::Imaging(other),
        }
    }
}

impl From<ArtifactError> for Error {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::AlreadyExists(_) => Error::Conflict(e.to_string()),
            ArtifactError::NotFound(_) => Error::NotFound(e.to_string()),
            other => Error::Artifact(other),
        }
    }
}

impl From<RepositoryError> for Error {
    fn from(e: RepositoryError) -> Self {
        if e.is_not_found() {
            Error::NotFound(e.to_string())
        } else {
            Error::Repository(e)
        }
    }
}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidUrl(url) => Error::InvalidInput(format!("not a post URL: {url}")),
            other => Error::Fetch(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
