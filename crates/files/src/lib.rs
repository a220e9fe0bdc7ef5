//! Filebox Content Store
//!
//! This crate stores the raw bytes of uploaded files. It knows nothing about file names,
//! types or owners beyond the owner id embedded in each blob key; descriptive metadata lives
//! in the metadata repository in `filebox-core`.
//!
//! ## Design Principles
//!
//! - Blobs are opaque byte payloads addressed by a generated [`BlobRef`]
//! - A blob is written once and never modified; replacing a file writes a new blob
//! - Writes are atomic: a blob is either fully present or absent
//! - Keys embed the owner id and a random component, so concurrent writers never collide
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! └── 3f/
//!     └── 9e/
//!         └── 42_3f9e1c…   # <owner>_<32 hex random>
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use filebox_files::{ContentStore, FsContentStore};
//! use filebox_types::UserId;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FsContentStore::create(Path::new("file_data/blobs"))?;
//! let blob = store.put(UserId::new(42), b"hello")?;
//! assert_eq!(store.get(&blob)?, b"hello");
//! # Ok(())
//! # }
//! ```

mod blob_ref;
mod constants;
mod files;
mod memory;

pub use blob_ref::BlobRef;
pub use constants::PARTIAL_SUFFIX;
pub use files::FsContentStore;
pub use memory::MemoryContentStore;

use filebox_types::UserId;

/// Errors that can occur during blob operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// A blob key did not match the `<owner>_<32 hex>` format
    #[error("Invalid blob reference: {0}")]
    InvalidBlobRef(String),

    /// No blob is stored under the given reference
    #[error("Blob not found: {0}")]
    BlobNotFound(BlobRef),

    /// A freshly generated key was already taken
    #[error("Blob {0} already exists in storage")]
    BlobAlreadyExists(BlobRef),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilesResult<T> = Result<T, FilesError>;

/// Durable mapping from a [`BlobRef`] to raw bytes.
///
/// Implementations must be safe to share between request workers. `put` must never leave a
/// partially written blob visible under the returned reference.
pub trait ContentStore: Send + Sync {
    /// Stores `bytes` under a freshly generated reference for `owner`.
    fn put(&self, owner: UserId, bytes: &[u8]) -> FilesResult<BlobRef>;

    /// Returns the full content of a blob.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::BlobNotFound`] if nothing is stored under `blob`.
    fn get(&self, blob: &BlobRef) -> FilesResult<Vec<u8>>;

    /// Removes a blob.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::BlobNotFound`] if nothing is stored under `blob`.
    fn delete(&self, blob: &BlobRef) -> FilesResult<()>;

    fn exists(&self, blob: &BlobRef) -> FilesResult<bool>;

    /// Lists every stored blob, in no particular order.
    fn list_refs(&self) -> FilesResult<Vec<BlobRef>>;
}
