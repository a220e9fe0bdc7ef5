//! File versioning service.
//!
//! Keeps the metadata repository and the content store consistent across upload, replace,
//! fetch and delete. Blobs are immutable: replacing a file writes a new blob, commits the
//! metadata pointing at it, and only then removes the old blob. A crash between steps can
//! leave an unreferenced blob behind but never a record pointing at missing or partial
//! content. [`FileVersioningService::reclaim_orphans`] removes such leftovers.

use crate::constants::FETCH_ATTEMPTS;
use crate::identity::Identity;
use crate::record::{new_record_for, FileId, FileRecord, IncomingFile};
use crate::repository::MetadataRepository;
use crate::{FileError, FileResult};
use chrono::Utc;
use filebox_files::{BlobRef, ContentStore, FilesError};
use std::collections::HashSet;
use std::sync::Arc;

/// Upload, replace, fetch and delete of stored files.
#[derive(Clone)]
pub struct FileVersioningService {
    repository: Arc<dyn MetadataRepository>,
    content: Arc<dyn ContentStore>,
}

impl FileVersioningService {
    pub fn new(repository: Arc<dyn MetadataRepository>, content: Arc<dyn ContentStore>) -> Self {
        Self {
            repository,
            content,
        }
    }

    /// Stores a new file owned by `owner`.
    ///
    /// # Errors
    ///
    /// - `FileError::Validation` if the content is empty or the name is unusable
    /// - `FileError::Conflict` if `owner` already has a file with this name
    /// - `FileError::ContentStore` / `FileError::MetadataStore` on storage failure
    pub fn upload(&self, file: IncomingFile, owner: &Identity) -> FileResult<FileRecord> {
        let file = file.validate()?;

        if self
            .repository
            .exists_by_owner_and_name(owner.user_id(), &file.name)?
        {
            return Err(FileError::Conflict(format!(
                "a file named '{}' already exists",
                file.name
            )));
        }

        let content_ref = self
            .content
            .put(owner.user_id(), &file.bytes)
            .map_err(FileError::ContentStore)?;

        let new_record = new_record_for(&file, content_ref.clone(), owner, Utc::now());
        let record = match self.repository.insert(new_record) {
            Ok(record) => record,
            Err(e) => {
                // Lost the race for the name, or the metadata write failed.
                self.discard_blob(&content_ref);
                return Err(e.into());
            }
        };

        tracing::info!(
            file_id = %record.id,
            owner = %record.owner_id,
            name = %record.name,
            size = record.size,
            "file uploaded"
        );
        Ok(record)
    }

    /// Replaces the content (and name) of an existing file.
    ///
    /// The owner and `created_at` are kept; the editor becomes `editor`.
    ///
    /// # Errors
    ///
    /// - `FileError::NotFound` if the file does not exist (or disappears mid-replace)
    /// - `FileError::Validation` if the content is empty or the name is unusable
    /// - `FileError::Conflict` if another update committed first, or the new name is
    ///   already used by another of the owner's files
    /// - `FileError::ContentStore` / `FileError::MetadataStore` on storage failure
    ///
    /// On any error the previous content stays in place.
    pub fn replace(
        &self,
        file_id: FileId,
        file: IncomingFile,
        editor: &Identity,
    ) -> FileResult<FileRecord> {
        let current = self.get_metadata(file_id)?;
        let file = file.validate()?;

        let new_ref = self
            .content
            .put(current.owner_id, &file.bytes)
            .map_err(FileError::ContentStore)?;

        let old_ref = current.content_ref.clone();
        let modified_at = Utc::now().max(current.modified_at);
        let updated = FileRecord {
            name: file.name,
            file_type: file.file_type,
            size: file.bytes.len() as u64,
            content_ref: new_ref.clone(),
            modified_at,
            editor_id: editor.user_id(),
            editor_name: editor.user_name().to_owned(),
            ..current
        };

        let committed = match self.repository.update(updated) {
            Ok(record) => record,
            Err(e) => {
                self.discard_blob(&new_ref);
                return Err(e.into());
            }
        };

        self.discard_blob(&old_ref);

        tracing::info!(
            file_id = %committed.id,
            editor = %committed.editor_id,
            name = %committed.name,
            size = committed.size,
            revision = committed.revision,
            "file replaced"
        );
        Ok(committed)
    }

    /// Returns a file's metadata together with its full content.
    ///
    /// # Errors
    ///
    /// - `FileError::NotFound` if no record exists
    /// - `FileError::Integrity` if the record's blob is missing or has the wrong length
    pub fn fetch(&self, file_id: FileId) -> FileResult<(FileRecord, Vec<u8>)> {
        let mut record = self.get_metadata(file_id)?;

        for _ in 0..FETCH_ATTEMPTS {
            match self.content.get(&record.content_ref) {
                Ok(bytes) => {
                    if bytes.len() as u64 != record.size {
                        return Err(FileError::Integrity {
                            id: file_id,
                            reason: format!(
                                "expected {} bytes, content store returned {}",
                                record.size,
                                bytes.len()
                            ),
                        });
                    }
                    tracing::debug!(file_id = %file_id, size = record.size, "file fetched");
                    return Ok((record, bytes));
                }
                Err(FilesError::BlobNotFound(_)) => {
                    // A concurrent replace may have swapped the blob after we read the record.
                    let latest = self.get_metadata(file_id)?;
                    if latest.content_ref == record.content_ref {
                        return Err(FileError::Integrity {
                            id: file_id,
                            reason: "content blob is missing".into(),
                        });
                    }
                    tracing::debug!(file_id = %file_id, "content replaced during fetch, retrying");
                    record = latest;
                }
                Err(e) => return Err(FileError::ContentStore(e)),
            }
        }

        Err(FileError::Integrity {
            id: file_id,
            reason: "content kept changing while being read".into(),
        })
    }

    /// Removes a file's record, then its content.
    ///
    /// # Errors
    ///
    /// Returns `FileError::NotFound` if the file does not exist.
    pub fn delete(&self, file_id: FileId) -> FileResult<()> {
        let removed = self.repository.delete(file_id)?;
        self.discard_blob(&removed.content_ref);

        tracing::info!(file_id = %file_id, owner = %removed.owner_id, name = %removed.name, "file deleted");
        Ok(())
    }

    pub fn get_metadata(&self, file_id: FileId) -> FileResult<FileRecord> {
        self.repository
            .find_by_id(file_id)?
            .ok_or(FileError::NotFound(file_id))
    }

    /// Deletes every blob that no record references and returns what was removed.
    ///
    /// Must only run while no uploads or replaces are in flight: a blob written by an
    /// in-flight upload is unreferenced until its record commits.
    pub fn reclaim_orphans(&self) -> FileResult<Vec<BlobRef>> {
        let referenced: HashSet<BlobRef> = self
            .repository
            .find_all()?
            .into_iter()
            .map(|record| record.content_ref)
            .collect();

        let mut reclaimed = Vec::new();
        for blob in self.content.list_refs().map_err(FileError::ContentStore)? {
            if referenced.contains(&blob) {
                continue;
            }
            match self.content.delete(&blob) {
                Ok(()) | Err(FilesError::BlobNotFound(_)) => {
                    tracing::info!(blob = %blob, "reclaimed orphaned blob");
                    reclaimed.push(blob);
                }
                Err(e) => return Err(FileError::ContentStore(e)),
            }
        }

        Ok(reclaimed)
    }

    /// Best-effort blob removal; a failure only leaves an orphan behind.
    fn discard_blob(&self, blob: &BlobRef) {
        if let Err(e) = self.content.delete(blob) {
            tracing::warn!(blob = %blob, error = %e, "failed to remove blob, leaving orphan");
        }
    }
}
