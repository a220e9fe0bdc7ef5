use crate::error::{RepositoryError, RepositoryResult};
use crate::record::{FileId, FileRecord, NewFileRecord};
use filebox_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// In-memory record table with the repository constraints.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordTable {
    last_id: u64,
    records: BTreeMap<FileId, FileRecord>,
    /// Secondary index: (owner, name) -> id
    by_owner_name: HashMap<(UserId, String), FileId>,
}

/// On-disk form of a [`RecordTable`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedTable {
    pub last_id: u64,
    pub records: Vec<FileRecord>,
}

impl RecordTable {
    pub fn insert(&mut self, record: NewFileRecord) -> RepositoryResult<FileRecord> {
        let key = (record.owner_id, record.name.clone());
        if self.by_owner_name.contains_key(&key) {
            return Err(RepositoryError::Conflict {
                owner_id: key.0,
                name: key.1,
            });
        }

        self.last_id += 1;
        let id = FileId::new(self.last_id);
        let record = record.into_record(id);

        self.by_owner_name.insert(key, id);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.records.get(&id)
    }

    pub fn contains_name(&self, owner_id: UserId, name: &str) -> bool {
        self.by_owner_name
            .contains_key(&(owner_id, name.to_owned()))
    }

    pub fn by_owner(&self, owner_id: UserId) -> Vec<FileRecord> {
        self.records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<FileRecord> {
        self.records.values().cloned().collect()
    }

    pub fn update(&mut self, mut record: FileRecord) -> RepositoryResult<FileRecord> {
        let stored = self
            .records
            .get(&record.id)
            .ok_or(RepositoryError::NotFound(record.id))?;

        if stored.revision != record.revision {
            return Err(RepositoryError::StaleRevision {
                id: record.id,
                expected: record.revision,
                found: stored.revision,
            });
        }

        record.created_at = stored.created_at;
        record.owner_id = stored.owner_id;
        record.owner_name = stored.owner_name.clone();

        let old_key = (stored.owner_id, stored.name.clone());
        let new_key = (record.owner_id, record.name.clone());
        if new_key != old_key {
            if self.by_owner_name.contains_key(&new_key) {
                return Err(RepositoryError::Conflict {
                    owner_id: new_key.0,
                    name: new_key.1,
                });
            }
            self.by_owner_name.remove(&old_key);
            self.by_owner_name.insert(new_key, record.id);
        }

        record.revision += 1;
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    pub fn delete(&mut self, id: FileId) -> RepositoryResult<FileRecord> {
        let removed = self
            .records
            .remove(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        self.by_owner_name
            .remove(&(removed.owner_id, removed.name.clone()));
        Ok(removed)
    }

    pub fn to_persisted(&self) -> PersistedTable {
        PersistedTable {
            last_id: self.last_id,
            records: self.all(),
        }
    }

    /// Rebuilds a table from its on-disk form, re-checking every constraint.
    pub fn from_persisted(persisted: PersistedTable) -> RepositoryResult<Self> {
        let mut table = RecordTable {
            last_id: persisted.last_id,
            ..Default::default()
        };

        for record in persisted.records {
            if record.id.get() > table.last_id {
                return Err(RepositoryError::Corrupt(format!(
                    "record id {} exceeds last assigned id {}",
                    record.id, table.last_id
                )));
            }
            let key = (record.owner_id, record.name.clone());
            if table.records.contains_key(&record.id) || table.by_owner_name.contains_key(&key)
            {
                return Err(RepositoryError::Corrupt(format!(
                    "duplicate record {} ('{}' for owner {})",
                    record.id, key.1, key.0
                )));
            }
            table.by_owner_name.insert(key, record.id);
            table.records.insert(record.id, record);
        }

        Ok(table)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use filebox_files::BlobRef;

    pub(crate) fn new_record(owner: i64, name: &str) -> NewFileRecord {
        NewFileRecord {
            name: name.to_owned(),
            file_type: crate::record::file_extension(name).unwrap_or_default(),
            size: 1,
            content_ref: BlobRef::generate(UserId::new(owner)),
            created_at: Utc::now(),
            owner_id: UserId::new(owner),
            owner_name: format!("user{owner}"),
        }
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let mut table = RecordTable::default();

        let a = table.insert(new_record(1, "a.kt")).unwrap();
        let b = table.insert(new_record(1, "b.kt")).unwrap();

        assert_eq!(a.id, FileId::new(1));
        assert_eq!(b.id, FileId::new(2));
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let mut table = RecordTable::default();
        let a = table.insert(new_record(1, "a.kt")).unwrap();
        table.delete(a.id).unwrap();

        let b = table.insert(new_record(1, "a.kt")).unwrap();

        assert_eq!(b.id, FileId::new(2));
    }

    #[test]
    fn test_insert_enforces_owner_name_uniqueness() {
        let mut table = RecordTable::default();
        table.insert(new_record(1, "a.kt")).unwrap();

        let dup = table.insert(new_record(1, "a.kt"));
        assert!(matches!(dup, Err(RepositoryError::Conflict { .. })));

        table
            .insert(new_record(2, "a.kt"))
            .expect("other owner may reuse the name");
    }

    #[test]
    fn test_update_checks_revision() {
        let mut table = RecordTable::default();
        let record = table.insert(new_record(1, "a.kt")).unwrap();

        let first = table.update(record.clone()).unwrap();
        assert_eq!(first.revision, 2);

        let stale = table.update(record);
        assert!(matches!(
            stale,
            Err(RepositoryError::StaleRevision {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_update_rename_moves_index() {
        let mut table = RecordTable::default();
        let mut record = table.insert(new_record(1, "a.kt")).unwrap();
        table.insert(new_record(1, "taken.kt")).unwrap();

        record.name = "taken.kt".into();
        assert!(matches!(
            table.update(record.clone()),
            Err(RepositoryError::Conflict { .. })
        ));

        record.name = "renamed.kt".into();
        table.update(record).unwrap();
        assert!(!table.contains_name(UserId::new(1), "a.kt"));
        assert!(table.contains_name(UserId::new(1), "renamed.kt"));
    }

    #[test]
    fn test_update_keeps_immutable_fields() {
        let mut table = RecordTable::default();
        let original = table.insert(new_record(1, "a.kt")).unwrap();

        let mut tampered = original.clone();
        tampered.owner_id = UserId::new(99);
        tampered.owner_name = "mallory".into();
        tampered.created_at = Utc::now() + chrono::Duration::days(1);

        let committed = table.update(tampered).unwrap();
        assert_eq!(committed.owner_id, original.owner_id);
        assert_eq!(committed.owner_name, original.owner_name);
        assert_eq!(committed.created_at, original.created_at);
    }

    #[test]
    fn test_from_persisted_rejects_duplicates() {
        let mut table = RecordTable::default();
        let record = table.insert(new_record(1, "a.kt")).unwrap();

        let persisted = PersistedTable {
            last_id: 5,
            records: vec![record.clone(), record],
        };

        assert!(matches!(
            RecordTable::from_persisted(persisted),
            Err(RepositoryError::Corrupt(_))
        ));
    }
}
