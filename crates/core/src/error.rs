use crate::record::FileId;
use filebox_files::FilesError;
use filebox_types::UserId;

/// Coarse classification of a [`FileError`], used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Integrity,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("file {0} not found")]
    NotFound(FileId),
    #[error("content of file {id} is unavailable: {reason}")]
    Integrity { id: FileId, reason: String },
    #[error("content store failure: {0}")]
    ContentStore(#[source] FilesError),
    #[error("metadata store failure: {0}")]
    MetadataStore(#[source] RepositoryError),
}

impl FileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::Validation(_) => ErrorKind::Validation,
            FileError::Conflict(_) => ErrorKind::Conflict,
            FileError::NotFound(_) => ErrorKind::NotFound,
            FileError::Integrity { .. } => ErrorKind::Integrity,
            FileError::ContentStore(_) | FileError::MetadataStore(_) => ErrorKind::Storage,
        }
    }

    /// True for a missing record and for a record whose content is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Integrity)
    }
}

impl From<RepositoryError> for FileError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => FileError::NotFound(id),
            err @ (RepositoryError::Conflict { .. } | RepositoryError::StaleRevision { .. }) => {
                FileError::Conflict(err.to_string())
            }
            other => FileError::MetadataStore(other),
        }
    }
}

pub type FileResult<T> = std::result::Result<T, FileError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("a file named '{name}' already exists for owner {owner_id}")]
    Conflict { owner_id: UserId, name: String },
    #[error("file {0} not found")]
    NotFound(FileId),
    #[error("file {id} was modified concurrently (expected revision {expected}, found {found})")]
    StaleRevision {
        id: FileId,
        expected: u64,
        found: u64,
    },
    #[error("failed to read metadata store: {0}")]
    Read(std::io::Error),
    #[error("failed to write metadata store: {0}")]
    Write(std::io::Error),
    #[error("failed to serialize metadata: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize metadata: {0}")]
    Deserialization(serde_json::Error),
    #[error("metadata store is corrupt: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
