//! File metadata records.
//!
//! A [`FileRecord`] describes one stored file: its display name, extension-derived type,
//! size, the blob holding its bytes, and who created and last edited it. Records are owned
//! by the metadata repository; the blob is owned by the content store. The versioning
//! service keeps the two consistent.

use crate::identity::Identity;
use crate::{FileError, FileResult};
use chrono::{DateTime, Utc};
use filebox_files::BlobRef;
use filebox_types::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric file identifier assigned by the metadata repository.
///
/// Identifiers increase monotonically, so ascending `FileId` order is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u64);

impl FileId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| FileError::Validation(format!("invalid file id: '{s}'")))
    }
}

/// Metadata row describing one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Display name, unique per owner.
    pub name: String,
    /// Lower-cased extension of `name`, never empty.
    pub file_type: String,
    /// Byte length of the current content.
    pub size: u64,
    pub content_ref: BlobRef,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub owner_id: UserId,
    pub owner_name: String,
    pub editor_id: UserId,
    pub editor_name: String,
    /// Optimistic-concurrency counter, bumped by every committed update.
    pub revision: u64,
}

/// A record about to be inserted; the repository assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub name: String,
    pub file_type: String,
    pub size: u64,
    pub content_ref: BlobRef,
    pub created_at: DateTime<Utc>,
    pub owner_id: UserId,
    pub owner_name: String,
}

impl NewFileRecord {
    /// Materialises the record under `id`: modified = created, editor = owner, revision 1.
    pub fn into_record(self, id: FileId) -> FileRecord {
        FileRecord {
            id,
            name: self.name,
            file_type: self.file_type,
            size: self.size,
            content_ref: self.content_ref,
            created_at: self.created_at,
            modified_at: self.created_at,
            editor_id: self.owner_id,
            editor_name: self.owner_name.clone(),
            owner_id: self.owner_id,
            owner_name: self.owner_name,
            revision: 1,
        }
    }
}

/// Uploaded content together with the filename it arrived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// An [`IncomingFile`] that passed validation.
#[derive(Debug)]
pub(crate) struct ValidatedFile {
    pub name: String,
    pub file_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Checks content and name, deriving the file type.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Validation` if:
    /// - the content is empty
    /// - the name is blank or contains path separators or control characters
    /// - the name has no extension
    pub(crate) fn validate(self) -> FileResult<ValidatedFile> {
        if self.bytes.is_empty() {
            return Err(FileError::Validation("no file content provided".into()));
        }

        let name = self.file_name;
        if name.trim().is_empty() {
            return Err(FileError::Validation("file name cannot be empty".into()));
        }
        if name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(FileError::Validation(format!(
                "file name '{}' must not contain path separators or control characters",
                name.escape_debug()
            )));
        }

        let file_type = file_extension(&name).ok_or_else(|| {
            FileError::Validation(format!("file '{name}' must have an extension"))
        })?;

        Ok(ValidatedFile {
            name,
            file_type,
            bytes: self.bytes,
        })
    }
}

/// Returns the lower-cased text after the last `.` of `name`.
///
/// `None` when there is no `.` or when it is the final character.
pub fn file_extension(name: &str) -> Option<String> {
    let (_, extension) = name.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }
    Some(extension.to_lowercase())
}

/// Builds the record an owner creates by uploading `file`.
pub(crate) fn new_record_for(
    file: &ValidatedFile,
    content_ref: BlobRef,
    owner: &Identity,
    now: DateTime<Utc>,
) -> NewFileRecord {
    NewFileRecord {
        name: file.name.clone(),
        file_type: file.file_type.clone(),
        size: file.bytes.len() as u64,
        content_ref,
        created_at: now,
        owner_id: owner.user_id(),
        owner_name: owner.user_name().to_owned(),
    }
}
