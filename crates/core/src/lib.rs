//! # Filebox Core
//!
//! Core business logic for the Filebox file storage service.
//!
//! This crate contains pure data operations over stored files:
//! - Upload, replace, fetch and delete with consistent metadata and content
//! - Listing with sort by type and type filtering
//! - Name-based sync reconciliation, and a folder sync built on it
//!
//! **No API concerns**: Authentication, HTTP servers, or service interfaces belong in
//! `api-rest` or `api-shared`. Callers pass an already-authenticated [`Identity`].

pub mod config;
pub mod constants;
pub mod content_type;
pub mod error;
pub mod folder_sync;
pub mod identity;
pub mod record;
pub mod repository;
pub mod sort_filter;
pub mod sync;
pub mod versioning;

pub use config::{max_upload_bytes_from_env_value, CoreConfig};
pub use content_type::content_type_for;
pub use error::{ErrorKind, FileError, FileResult, RepositoryError, RepositoryResult};
pub use folder_sync::{list_local_names, FolderSync, FolderSyncReport, SyncDirection, SyncFailure};
pub use identity::Identity;
pub use record::{FileId, FileRecord, IncomingFile, NewFileRecord};
pub use repository::{JsonMetadataRepository, MemoryMetadataRepository, MetadataRepository};
pub use sort_filter::{SortDirection, SortFilterService};
pub use sync::{reconcile, SyncPlan, SyncReconciler};
pub use versioning::FileVersioningService;

pub use filebox_files::{BlobRef, ContentStore, FsContentStore, MemoryContentStore};
pub use filebox_types::UserId;

use std::fs;
use std::sync::Arc;

/// The core services wired to one metadata repository and one content store.
#[derive(Clone)]
pub struct Filebox {
    pub files: FileVersioningService,
    pub listing: SortFilterService,
    pub sync: SyncReconciler,
    pub folder_sync: FolderSync,
}

impl Filebox {
    pub fn new(repository: Arc<dyn MetadataRepository>, content: Arc<dyn ContentStore>) -> Self {
        let files = FileVersioningService::new(repository.clone(), content);
        let listing = SortFilterService::new(repository);
        let sync = SyncReconciler::new(listing.clone());
        let folder_sync = FolderSync::new(files.clone(), sync.clone());

        Self {
            files,
            listing,
            sync,
            folder_sync,
        }
    }

    /// Opens the durable stores under `config.data_dir()`, creating it if needed.
    ///
    /// # Errors
    ///
    /// - `FileError::ContentStore` if the data or blob directory cannot be created
    /// - `FileError::MetadataStore` if the metadata file cannot be read or is corrupt
    pub fn open(config: &CoreConfig) -> FileResult<Self> {
        fs::create_dir_all(config.data_dir())
            .map_err(|e| FileError::ContentStore(filebox_files::FilesError::Io(e)))?;

        let content = FsContentStore::create(&config.blobs_dir()).map_err(FileError::ContentStore)?;
        let repository = JsonMetadataRepository::open(&config.metadata_path())?;

        tracing::info!(data_dir = %config.data_dir().display(), "opened file store");
        Ok(Self::new(Arc::new(repository), Arc::new(content)))
    }

    /// Process-local stores, for tests and throwaway runs.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryMetadataRepository::new()),
            Arc::new(MemoryContentStore::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let config = CoreConfig::new(temp.path().join("data"), 1024).unwrap();
        let alice = Identity::new(1, "alice").unwrap();

        let id = {
            let filebox = Filebox::open(&config).unwrap();
            filebox
                .files
                .upload(IncomingFile::new("notes.kt", b"val x = 1".to_vec()), &alice)
                .unwrap()
                .id
        };

        let reopened = Filebox::open(&config).unwrap();
        let (record, bytes) = reopened.files.fetch(id).unwrap();
        assert_eq!(record.name, "notes.kt");
        assert_eq!(bytes, b"val x = 1");
        assert!(config.metadata_path().is_file());
        assert!(config.blobs_dir().is_dir());
    }
}
