//! Listing, sorting and type filtering of file records.

use crate::record::FileRecord;
use crate::repository::MetadataRepository;
use crate::FileResult;
use filebox_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// Read-only views over the metadata repository.
#[derive(Clone)]
pub struct SortFilterService {
    repository: Arc<dyn MetadataRepository>,
}

impl SortFilterService {
    pub fn new(repository: Arc<dyn MetadataRepository>) -> Self {
        Self { repository }
    }

    /// Lists every record, sorted by `file_type` when a direction is given.
    ///
    /// The sort is stable and compares types byte-wise, so records with equal types stay
    /// in repository (ascending id) order. Without a direction the repository order is
    /// returned unchanged.
    pub fn list_sorted(&self, direction: Option<SortDirection>) -> FileResult<Vec<FileRecord>> {
        let mut records = self.repository.find_all()?;
        match direction {
            Some(SortDirection::Ascending) => {
                records.sort_by(|a, b| a.file_type.as_bytes().cmp(b.file_type.as_bytes()));
            }
            Some(SortDirection::Descending) => {
                records.sort_by(|a, b| b.file_type.as_bytes().cmp(a.file_type.as_bytes()));
            }
            None => {}
        }
        Ok(records)
    }

    /// Keeps the records whose `file_type` is one of `types`, preserving input order.
    ///
    /// Tokens are trimmed and lower-cased before matching; blank tokens are ignored. With
    /// no usable tokens the input is returned unchanged.
    pub fn filter_by_type<S: AsRef<str>>(records: Vec<FileRecord>, types: &[S]) -> Vec<FileRecord> {
        let wanted: HashSet<String> = types
            .iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if wanted.is_empty() {
            return records;
        }

        records
            .into_iter()
            .filter(|r| wanted.contains(&r.file_type))
            .collect()
    }

    /// [`list_sorted`](Self::list_sorted) followed by [`filter_by_type`](Self::filter_by_type).
    pub fn sort_and_filter<S: AsRef<str>>(
        &self,
        direction: Option<SortDirection>,
        types: &[S],
    ) -> FileResult<Vec<FileRecord>> {
        let sorted = self.list_sorted(direction)?;
        Ok(Self::filter_by_type(sorted, types))
    }

    pub fn list_for_owner(&self, owner_id: UserId) -> FileResult<Vec<FileRecord>> {
        Ok(self.repository.find_by_owner(owner_id)?)
    }
}
