//! In-memory content store (for tests and ephemeral deployments).

use crate::{BlobRef, ContentStore, FilesError, FilesResult};
use filebox_types::UserId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<RwLock<HashMap<BlobRef, Vec<u8>>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn put(&self, owner: UserId, bytes: &[u8]) -> FilesResult<BlobRef> {
        let blob = BlobRef::generate(owner);
        let mut blobs = self.blobs.write();
        if blobs.contains_key(&blob) {
            return Err(FilesError::BlobAlreadyExists(blob));
        }
        blobs.insert(blob.clone(), bytes.to_vec());
        Ok(blob)
    }

    fn get(&self, blob: &BlobRef) -> FilesResult<Vec<u8>> {
        self.blobs
            .read()
            .get(blob)
            .cloned()
            .ok_or_else(|| FilesError::BlobNotFound(blob.clone()))
    }

    fn delete(&self, blob: &BlobRef) -> FilesResult<()> {
        self.blobs
            .write()
            .remove(blob)
            .map(|_| ())
            .ok_or_else(|| FilesError::BlobNotFound(blob.clone()))
    }

    fn exists(&self, blob: &BlobRef) -> FilesResult<bool> {
        Ok(self.blobs.read().contains_key(blob))
    }

    fn list_refs(&self) -> FilesResult<Vec<BlobRef>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryContentStore::new();

        let blob = store.put(UserId::new(1), b"abc").unwrap();
        assert_eq!(store.get(&blob).unwrap(), b"abc");
        assert_eq!(store.len(), 1);

        store.delete(&blob).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.get(&blob), Err(FilesError::BlobNotFound(_))));
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryContentStore::new();
        let clone = store.clone();

        let blob = store.put(UserId::new(2), b"x").unwrap();

        assert!(clone.exists(&blob).unwrap());
        assert_eq!(clone.list_refs().unwrap(), vec![blob]);
    }
}
