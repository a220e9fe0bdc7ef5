use super::table::RecordTable;
use super::MetadataRepository;
use crate::error::RepositoryResult;
use crate::record::{FileId, FileRecord, NewFileRecord};
use filebox_types::UserId;
use parking_lot::RwLock;

/// In-memory metadata repository (for tests and small deployments).
#[derive(Default)]
pub struct MemoryMetadataRepository {
    table: RwLock<RecordTable>,
}

impl MemoryMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataRepository for MemoryMetadataRepository {
    fn insert(&self, record: NewFileRecord) -> RepositoryResult<FileRecord> {
        self.table.write().insert(record)
    }

    fn find_by_id(&self, id: FileId) -> RepositoryResult<Option<FileRecord>> {
        Ok(self.table.read().get(id).cloned())
    }

    fn exists_by_owner_and_name(&self, owner_id: UserId, name: &str) -> RepositoryResult<bool> {
        Ok(self.table.read().contains_name(owner_id, name))
    }

    fn find_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<FileRecord>> {
        Ok(self.table.read().by_owner(owner_id))
    }

    fn find_all(&self) -> RepositoryResult<Vec<FileRecord>> {
        Ok(self.table.read().all())
    }

    fn update(&self, record: FileRecord) -> RepositoryResult<FileRecord> {
        self.table.write().update(record)
    }

    fn delete(&self, id: FileId) -> RepositoryResult<FileRecord> {
        self.table.write().delete(id)
    }
}
