//! Name-based sync reconciliation.
//!
//! A client reports the file names present in its local folder; the server answers with
//! which names it should upload and which it should download. Only names are compared:
//! a file present on both sides is considered in sync regardless of content.

use crate::record::FileRecord;
use crate::sort_filter::SortFilterService;
use crate::FileResult;
use filebox_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The difference between a client's local names and its owner's remote names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Present locally, missing remotely.
    pub to_upload: BTreeSet<String>,
    /// Present remotely, missing locally.
    pub to_download: BTreeSet<String>,
}

impl SyncPlan {
    pub fn is_in_sync(&self) -> bool {
        self.to_upload.is_empty() && self.to_download.is_empty()
    }
}

/// Computes `local − remote` and `remote − local`. Duplicates on either side collapse.
pub fn reconcile<L, R>(local: L, remote: R) -> SyncPlan
where
    L: IntoIterator,
    L::Item: Into<String>,
    R: IntoIterator,
    R::Item: Into<String>,
{
    let local: BTreeSet<String> = local.into_iter().map(Into::into).collect();
    let remote: BTreeSet<String> = remote.into_iter().map(Into::into).collect();

    SyncPlan {
        to_upload: local.difference(&remote).cloned().collect(),
        to_download: remote.difference(&local).cloned().collect(),
    }
}

#[derive(Clone)]
pub struct SyncReconciler {
    listing: SortFilterService,
}

impl SyncReconciler {
    pub fn new(listing: SortFilterService) -> Self {
        Self { listing }
    }

    /// Compares `local_names` against the names of the files `owner_id` owns.
    pub fn compare<I>(&self, owner_id: UserId, local_names: I) -> FileResult<SyncPlan>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let remote = self
            .listing
            .list_for_owner(owner_id)?
            .into_iter()
            .map(|record| record.name);

        let plan = reconcile(local_names, remote);
        tracing::debug!(
            owner = %owner_id,
            to_upload = plan.to_upload.len(),
            to_download = plan.to_download.len(),
            "sync compared"
        );
        Ok(plan)
    }

    /// The records `owner_id` owns, in repository order.
    pub fn remote_files(&self, owner_id: UserId) -> FileResult<Vec<FileRecord>> {
        self.listing.list_for_owner(owner_id)
    }
}
