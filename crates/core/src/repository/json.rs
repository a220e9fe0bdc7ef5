//! Durable metadata repository backed by a single JSON file.
//!
//! The whole table is held in memory and rewritten on every mutation:
//!
//! 1. apply the mutation to a copy of the table
//! 2. serialise the copy to `<path>.tmp`, fsync, rename over `<path>`
//! 3. swap the copy in
//!
//! The lock is held across all three steps, so a failed write leaves both the file and the
//! in-memory table at the previous state.

use super::table::{PersistedTable, RecordTable};
use super::MetadataRepository;
use crate::error::{RepositoryError, RepositoryResult};
use crate::record::{FileId, FileRecord, NewFileRecord};
use filebox_types::UserId;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JsonMetadataRepository {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

impl JsonMetadataRepository {
    /// Opens the repository at `path`, starting empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::Read` if the file exists but cannot be read
    /// - `RepositoryError::Deserialization` / `Corrupt` if its content is invalid
    pub fn open(path: &Path) -> RepositoryResult<Self> {
        let table = match fs::read(path) {
            Ok(bytes) => {
                let persisted: PersistedTable =
                    serde_json::from_slice(&bytes).map_err(RepositoryError::Deserialization)?;
                RecordTable::from_persisted(persisted)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordTable::default(),
            Err(e) => return Err(RepositoryError::Read(e)),
        };

        tracing::debug!(path = %path.display(), "opened metadata store");

        Ok(Self {
            path: path.to_path_buf(),
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, table: &RecordTable) -> RepositoryResult<()> {
        let bytes = serde_json::to_vec_pretty(&table.to_persisted())
            .map_err(RepositoryError::Serialization)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(RepositoryError::Write)?;
        }

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(RepositoryError::Write(e));
        }
        Ok(())
    }

    /// Runs `mutation` against a copy of the table and commits it only if persisting
    /// succeeds.
    fn commit<T>(
        &self,
        mutation: impl FnOnce(&mut RecordTable) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let mut table = self.table.lock();
        let mut next = table.clone();
        let out = mutation(&mut next)?;
        self.persist(&next)?;
        *table = next;
        Ok(out)
    }
}

impl MetadataRepository for JsonMetadataRepository {
    fn insert(&self, record: NewFileRecord) -> RepositoryResult<FileRecord> {
        self.commit(|table| table.insert(record))
    }

    fn find_by_id(&self, id: FileId) -> RepositoryResult<Option<FileRecord>> {
        Ok(self.table.lock().get(id).cloned())
    }

    fn exists_by_owner_and_name(&self, owner_id: UserId, name: &str) -> RepositoryResult<bool> {
        Ok(self.table.lock().contains_name(owner_id, name))
    }

    fn find_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<FileRecord>> {
        Ok(self.table.lock().by_owner(owner_id))
    }

    fn find_all(&self) -> RepositoryResult<Vec<FileRecord>> {
        Ok(self.table.lock().all())
    }

    fn update(&self, record: FileRecord) -> RepositoryResult<FileRecord> {
        self.commit(|table| table.update(record))
    }

    fn delete(&self, id: FileId) -> RepositoryResult<FileRecord> {
        self.commit(|table| table.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::table::tests::new_record;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let repo = JsonMetadataRepository::open(&temp.path().join("metadata.json")).unwrap();

        assert!(repo.find_all().unwrap().is_empty());
        assert!(!repo.path().exists(), "file is only written on first mutation");
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("metadata.json");

        let (kept, removed) = {
            let repo = JsonMetadataRepository::open(&path).unwrap();
            let kept = repo.insert(new_record(1, "keep.kt")).unwrap();
            let removed = repo.insert(new_record(1, "drop.kt")).unwrap();
            repo.delete(removed.id).unwrap();
            (kept, removed)
        };

        let reopened = JsonMetadataRepository::open(&path).unwrap();
        assert_eq!(reopened.find_all().unwrap(), vec![kept.clone()]);
        assert!(reopened.find_by_id(removed.id).unwrap().is_none());
        assert!(reopened
            .exists_by_owner_and_name(UserId::new(1), "keep.kt")
            .unwrap());

        let next = reopened.insert(new_record(1, "next.kt")).unwrap();
        assert_eq!(next.id, FileId::new(3), "ids continue after reopen");
    }

    #[test]
    fn test_failed_constraint_does_not_touch_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("metadata.json");
        let repo = JsonMetadataRepository::open(&path).unwrap();
        repo.insert(new_record(1, "a.kt")).unwrap();
        let before = fs::read(&path).unwrap();

        assert!(matches!(
            repo.insert(new_record(1, "a.kt")),
            Err(RepositoryError::Conflict { .. })
        ));

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("metadata.json");
        fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            JsonMetadataRepository::open(&path),
            Err(RepositoryError::Deserialization(_))
        ));
    }
}
