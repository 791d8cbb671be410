use std::path::PathBuf;

use crate::Hash;

/// error type for dio operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("commit not found: {0}")]
    CommitNotFound(Hash),

    #[error("tag not found: {0}")]
    TagNotFound(String),

    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    #[error("object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("tag already exists: {0}")]
    TagExists(String),

    #[error("release already exists: {0}")]
    ReleaseExists(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("corrupt object: hash mismatch for {0}")]
    CorruptObject(Hash),

    #[error("corrupt metadata at {0}")]
    CorruptMetadata(PathBuf),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {message}")]
    Transport { message: String },
}

/// coarse taxonomy for callers that map errors onto a wire protocol
/// (404 = NotFound, 400 = Validation, 409 = Conflict, 500 = Integrity/Io)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Integrity,
    Io,
}

impl Error {
    /// classify this error for transport-level status mapping
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DatabaseNotFound(_)
            | Error::BranchNotFound(_)
            | Error::CommitNotFound(_)
            | Error::TagNotFound(_)
            | Error::ReleaseNotFound(_)
            | Error::ObjectNotFound(_) => ErrorKind::NotFound,

            Error::BranchExists(_) | Error::TagExists(_) | Error::ReleaseExists(_) => {
                ErrorKind::Conflict
            }

            Error::Validation(_) | Error::InvalidHashHex(_) => ErrorKind::Validation,

            Error::CorruptObject(_) | Error::CorruptMetadata(_) | Error::Json(_) => {
                ErrorKind::Integrity
            }

            Error::Io { .. } | Error::Transport { .. } => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
