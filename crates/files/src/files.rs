//! Filesystem-backed content store.
//!
//! [`FsContentStore`] keeps each blob in its own file under a sharded directory tree rooted
//! at a configured directory. It is the production store; the in-memory store in
//! [`crate::MemoryContentStore`] backs tests.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! └── <s1>/            # first two hex chars of the random key component
//!     └── <s2>/        # next two hex chars
//!         └── <owner>_<32 hex>
//! ```
//!
//! # Atomicity
//!
//! Blobs are written to `<path>.partial` and renamed into place, so a reader never observes
//! a half-written blob and a crash mid-write leaves at most a stray `.partial` file that
//! [`FsContentStore::list_refs`] ignores.
//!
//! # Security Model
//!
//! - The root is canonicalised at construction time
//! - Blob paths are derived only from validated [`BlobRef`] values, which cannot contain
//!   path separators or `..`

use crate::constants::PARTIAL_SUFFIX;
use crate::{BlobRef, ContentStore, FilesError, FilesResult};
use filebox_types::UserId;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Content store rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    /// Canonicalised directory holding all blob shards
    root_directory: PathBuf,
}

impl FsContentStore {
    /// Opens a store rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if:
    /// - the root directory does not exist or is not a directory
    /// - path canonicalisation fails
    pub fn new(root_directory: &Path) -> FilesResult<Self> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Creates the root directory if needed, then opens it.
    pub fn create(root_directory: &Path) -> FilesResult<Self> {
        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;
        Self::new(root_directory)
    }

    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn blob_path(&self, blob: &BlobRef) -> PathBuf {
        blob.sharded_path(&self.root_directory)
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        let result = (|| {
            let mut file = fs::File::create(&partial)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&partial, path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&partial);
        }
        result
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, owner: UserId, bytes: &[u8]) -> FilesResult<BlobRef> {
        let blob = BlobRef::generate(owner);
        let path = self.blob_path(&blob);

        if path.exists() {
            return Err(FilesError::BlobAlreadyExists(blob));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        Self::write_atomically(&path, bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write blob to {}: {}", path.display(), e),
            ))
        })?;

        tracing::debug!(blob = %blob, size = bytes.len(), "stored blob");
        Ok(blob)
    }

    fn get(&self, blob: &BlobRef) -> FilesResult<Vec<u8>> {
        let path = self.blob_path(blob);

        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FilesError::BlobNotFound(blob.clone()))
            }
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read blob from {}: {}", path.display(), e),
            ))),
        }
    }

    fn delete(&self, blob: &BlobRef) -> FilesResult<()> {
        let path = self.blob_path(blob);

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(blob = %blob, "deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FilesError::BlobNotFound(blob.clone()))
            }
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to delete blob {}: {}", path.display(), e),
            ))),
        }
    }

    fn exists(&self, blob: &BlobRef) -> FilesResult<bool> {
        let path = self.blob_path(blob);
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to stat blob {}: {}", path.display(), e),
            ))),
        }
    }

    fn list_refs(&self) -> FilesResult<Vec<BlobRef>> {
        let mut refs = Vec::new();

        for s1 in fs::read_dir(&self.root_directory)? {
            let s1 = s1?.path();
            if !s1.is_dir() {
                continue;
            }
            for s2 in fs::read_dir(&s1)? {
                let s2 = s2?.path();
                if !s2.is_dir() {
                    continue;
                }
                for entry in fs::read_dir(&s2)? {
                    let entry = entry?;
                    let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                        continue;
                    };
                    match BlobRef::parse(&name) {
                        Ok(blob) => refs.push(blob),
                        Err(_) => tracing::debug!(file = %name, "skipping non-blob entry"),
                    }
                }
            }
        }

        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(temp: &TempDir) -> FsContentStore {
        FsContentStore::create(&temp.path().join("blobs")).expect("store should open")
    }

    #[test]
    fn test_new_root_not_exists() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("non-existent");

        let store = FsContentStore::new(&root);

        assert!(matches!(store, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_root_not_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let store = FsContentStore::new(&root);

        assert!(matches!(store, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_create_makes_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a").join("b");

        let store = FsContentStore::create(&root).expect("create should succeed");

        assert!(root.is_dir());
        assert_eq!(store.root_directory(), root.canonicalize().unwrap());
    }

    #[test]
    fn test_put_writes_sharded_file() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let blob = store.put(UserId::new(5), b"Hello, World!").unwrap();

        let path = store.blob_path(&blob);
        assert!(path.is_file());
        assert!(path.starts_with(store.root_directory()));
        assert_eq!(fs::read(&path).unwrap(), b"Hello, World!");

        let mut partial = path.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        assert!(!PathBuf::from(partial).exists());
    }

    #[test]
    fn test_get_roundtrip_binary() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let bytes: Vec<u8> = (0..=255).collect();

        let blob = store.put(UserId::new(1), &bytes).unwrap();

        assert_eq!(store.get(&blob).unwrap(), bytes);
        assert!(store.exists(&blob).unwrap());
    }

    #[test]
    fn test_get_missing_blob() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let blob = BlobRef::generate(UserId::new(1));

        let result = store.get(&blob);

        assert!(matches!(result, Err(FilesError::BlobNotFound(b)) if b == blob));
    }

    #[test]
    fn test_exists_reports_io_errors() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let blob = BlobRef::parse("1_abcdef0123456789abcdef0123456789").unwrap();
        // A regular file where the first shard directory belongs.
        fs::write(store.root_directory().join("ab"), b"in the way").unwrap();

        let result = store.exists(&blob);

        assert!(matches!(result, Err(FilesError::Io(_))));
    }

    #[test]
    fn test_delete_removes_blob() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let blob = store.put(UserId::new(1), b"data").unwrap();

        store.delete(&blob).unwrap();

        assert!(!store.exists(&blob).unwrap());
        assert!(matches!(
            store.delete(&blob),
            Err(FilesError::BlobNotFound(_))
        ));
    }

    #[test]
    fn test_list_refs_skips_partial_files() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let a = store.put(UserId::new(1), b"a").unwrap();
        let b = store.put(UserId::new(2), b"b").unwrap();

        let mut stray = store.blob_path(&a).into_os_string();
        stray.push(PARTIAL_SUFFIX);
        fs::write(PathBuf::from(stray), b"half").unwrap();

        let mut refs = store.list_refs().unwrap();
        refs.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(refs, expected);
    }

    #[test]
    fn test_two_stores_same_root_share_blobs() {
        let temp = TempDir::new().unwrap();
        let first = test_store(&temp);
        let second = FsContentStore::new(&temp.path().join("blobs")).unwrap();

        let blob = first.put(UserId::new(3), b"shared").unwrap();

        assert_eq!(second.get(&blob).unwrap(), b"shared");
    }
}
