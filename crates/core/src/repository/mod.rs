//! Metadata repositories.
//!
//! The [`MetadataRepository`] trait is the narrow interface the services depend on. Two
//! implementations share one in-memory table with the constraint logic:
//!
//! - [`MemoryMetadataRepository`]: process-local, for tests and ephemeral runs
//! - [`JsonMetadataRepository`]: durable, persisted atomically to a JSON file
//!
//! Both enforce the `(owner_id, name)` uniqueness constraint and the optimistic revision
//! check inside their lock, which makes the repository the serialisation point for
//! concurrent uploads, replaces and deletes.

mod json;
mod memory;
pub(crate) mod table;

pub use json::JsonMetadataRepository;
pub use memory::MemoryMetadataRepository;

use crate::error::RepositoryResult;
use crate::record::{FileId, FileRecord, NewFileRecord};
use filebox_types::UserId;

/// Storage of [`FileRecord`] values keyed by [`FileId`].
///
/// Listing methods return records in ascending id order.
pub trait MetadataRepository: Send + Sync {
    /// Inserts a record, assigning the next id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the owner already has a file with this name.
    fn insert(&self, record: NewFileRecord) -> RepositoryResult<FileRecord>;

    fn find_by_id(&self, id: FileId) -> RepositoryResult<Option<FileRecord>>;

    fn exists_by_owner_and_name(&self, owner_id: UserId, name: &str) -> RepositoryResult<bool>;

    fn find_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<FileRecord>>;

    fn find_all(&self) -> RepositoryResult<Vec<FileRecord>>;

    /// Commits a modified record.
    ///
    /// `record.revision` must equal the stored revision; the committed record carries the
    /// next revision. `created_at` and the owner fields are kept from the stored record.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the record no longer exists
    /// - `RepositoryError::StaleRevision` if another update committed first
    /// - `RepositoryError::Conflict` if the new name is taken by another of the owner's files
    fn update(&self, record: FileRecord) -> RepositoryResult<FileRecord>;

    /// Removes a record, returning it as it was at removal time.
    fn delete(&self, id: FileId) -> RepositoryResult<FileRecord>;
}
