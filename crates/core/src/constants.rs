//! Constants used throughout the Filebox core crate.
//!
//! This module contains path, filename and limit constants to ensure
//! consistency across the codebase.

/// Default directory for file data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "file_data";

/// Directory name (under the data directory) holding content blobs.
pub const BLOBS_DIR_NAME: &str = "blobs";

/// Filename (under the data directory) of the JSON metadata store.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Default maximum accepted upload size: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Content type served for extensions missing from the static table.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// How many times `fetch` re-reads a record whose blob vanished mid-read.
pub(crate) const FETCH_ATTEMPTS: usize = 3;
