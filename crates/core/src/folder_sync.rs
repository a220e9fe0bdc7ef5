//! Two-way sync between a local folder and one owner's remote files.
//!
//! Only the top level of the folder takes part; subdirectories are ignored. Files are
//! matched by name, so a file present on both sides is left alone even if its content
//! differs. Downloaded files never overwrite anything already in the folder.
//!
//! Remote names that are not valid local file names are downloaded under their sanitised
//! form. A local file carrying that form counts as the remote file when comparing, as long
//! as no other remote file sanitises to the same name or already uses it.

use crate::identity::Identity;
use crate::record::{FileRecord, IncomingFile};
use crate::sync::{reconcile, SyncPlan, SyncReconciler};
use crate::versioning::FileVersioningService;
use crate::{FileError, FileResult};
use sanitize_filename::sanitize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Names of the regular files directly inside `folder`, sorted.
///
/// Entries whose names are not valid UTF-8 are skipped.
///
/// # Errors
///
/// Returns `FileError::Validation` if `folder` is not a readable directory.
pub fn list_local_names(folder: &Path) -> FileResult<Vec<String>> {
    if !folder.is_dir() {
        return Err(FileError::Validation(format!(
            "'{}' is not a directory",
            folder.display()
        )));
    }

    let entries = fs::read_dir(folder).map_err(|e| local_io_error(folder, &e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| local_io_error(folder, &e))?;
        let file_type = entry.file_type().map_err(|e| local_io_error(folder, &e))?;
        if !file_type.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::debug!(name = ?raw, "skipping non UTF-8 file name"),
        }
    }

    names.sort();
    Ok(names)
}

/// Maps local names that are the sanitised download of a remote file back to that file's
/// remote name.
fn as_remote_names(local: Vec<String>, remote: &HashMap<String, FileRecord>) -> Vec<String> {
    // `None` marks a local name that more than one remote file sanitises to.
    let mut downloaded_as: HashMap<String, Option<&str>> = HashMap::new();
    for name in remote.keys() {
        let local_name = sanitize(name);
        if local_name != *name && !remote.contains_key(&local_name) {
            downloaded_as
                .entry(local_name)
                .and_modify(|entry| *entry = None)
                .or_insert(Some(name.as_str()));
        }
    }

    local
        .into_iter()
        .map(|name| match downloaded_as.get(&name) {
            Some(Some(remote_name)) => (*remote_name).to_owned(),
            _ => name,
        })
        .collect()
}

fn local_io_error(path: &Path, err: &std::io::Error) -> FileError {
    FileError::Validation(format!("cannot read '{}': {err}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Upload,
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub name: String,
    pub direction: SyncDirection,
    pub reason: String,
}

/// Outcome of one [`FolderSync::sync`] run.
#[derive(Debug, Default)]
pub struct FolderSyncReport {
    pub plan: SyncPlan,
    pub uploaded: Vec<FileRecord>,
    /// Paths written into the folder.
    pub downloaded: Vec<PathBuf>,
    pub failures: Vec<SyncFailure>,
}

impl FolderSyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct FolderSync {
    files: FileVersioningService,
    reconciler: SyncReconciler,
}

impl FolderSync {
    pub fn new(files: FileVersioningService, reconciler: SyncReconciler) -> Self {
        Self { files, reconciler }
    }

    /// Computes what a sync of `folder` would do without changing anything.
    pub fn plan(&self, folder: &Path, identity: &Identity) -> FileResult<SyncPlan> {
        Ok(self.plan_with_remote(folder, identity)?.0)
    }

    fn plan_with_remote(
        &self,
        folder: &Path,
        identity: &Identity,
    ) -> FileResult<(SyncPlan, HashMap<String, FileRecord>)> {
        let local = list_local_names(folder)?;
        let remote: HashMap<String, FileRecord> = self
            .reconciler
            .remote_files(identity.user_id())?
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();

        let plan = reconcile(as_remote_names(local, &remote), remote.keys().cloned());
        tracing::debug!(
            owner = %identity.user_id(),
            to_upload = plan.to_upload.len(),
            to_download = plan.to_download.len(),
            "folder sync planned"
        );
        Ok((plan, remote))
    }

    /// Uploads local-only files and downloads remote-only files.
    ///
    /// Failures of individual files are collected in the report; only failing to read the
    /// folder or the remote listing aborts the run.
    pub fn sync(&self, folder: &Path, identity: &Identity) -> FileResult<FolderSyncReport> {
        let (plan, remote) = self.plan_with_remote(folder, identity)?;
        let mut report = FolderSyncReport::default();

        for name in &plan.to_upload {
            match self.upload_one(folder, name, identity) {
                Ok(record) => report.uploaded.push(record),
                Err(e) => report.failures.push(SyncFailure {
                    name: name.clone(),
                    direction: SyncDirection::Upload,
                    reason: e.to_string(),
                }),
            }
        }

        for name in &plan.to_download {
            let result = match remote.get(name) {
                Some(record) => self.download_one(folder, record),
                None => Err(format!("'{name}' is not in the remote listing")),
            };
            match result {
                Ok(path) => report.downloaded.push(path),
                Err(reason) => report.failures.push(SyncFailure {
                    name: name.clone(),
                    direction: SyncDirection::Download,
                    reason,
                }),
            }
        }

        tracing::info!(
            folder = %folder.display(),
            owner = %identity.user_id(),
            uploaded = report.uploaded.len(),
            downloaded = report.downloaded.len(),
            failed = report.failures.len(),
            "folder sync finished"
        );

        report.plan = plan;
        Ok(report)
    }

    fn upload_one(&self, folder: &Path, name: &str, identity: &Identity) -> FileResult<FileRecord> {
        let bytes = fs::read(folder.join(name)).map_err(|e| local_io_error(&folder.join(name), &e))?;
        self.files.upload(IncomingFile::new(name, bytes), identity)
    }

    fn download_one(&self, folder: &Path, record: &FileRecord) -> Result<PathBuf, String> {
        let local_name = sanitize(&record.name);
        if local_name.is_empty() {
            return Err(format!("'{}' has no usable local file name", record.name));
        }

        let (_, bytes) = self.files.fetch(record.id).map_err(|e| e.to_string())?;

        let path = folder.join(&local_name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| format!("cannot create '{}': {e}", path.display()))?;
        if let Err(e) = file.write_all(&bytes).and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(&path);
            return Err(format!("cannot write '{}': {e}", path.display()));
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Filebox;
    use tempfile::TempDir;

    fn alice() -> Identity {
        Identity::new(1, "alice").unwrap()
    }

    #[test]
    fn test_list_local_names_returns_top_level_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file2.js"), b"js").unwrap();
        fs::write(temp.path().join("file1.kt"), b"kt").unwrap();
        fs::write(temp.path().join("file3.png"), b"png").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested").join("deep.kt"), b"kt").unwrap();

        let names = list_local_names(temp.path()).unwrap();

        assert_eq!(names, vec!["file1.kt", "file2.js", "file3.png"]);
    }

    #[test]
    fn test_list_local_names_empty_folder() {
        let temp = TempDir::new().unwrap();
        assert!(list_local_names(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_local_names_missing_folder() {
        let temp = TempDir::new().unwrap();
        let err = list_local_names(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, FileError::Validation(_)));
    }

    #[test]
    fn test_sync_uploads_and_downloads() {
        let filebox = Filebox::in_memory();
        let folder = TempDir::new().unwrap();
        fs::write(folder.path().join("common.kt"), b"local common").unwrap();
        fs::write(folder.path().join("localOnly.png"), b"png bytes").unwrap();
        filebox
            .files
            .upload(IncomingFile::new("common.kt", b"remote common".to_vec()), &alice())
            .unwrap();
        filebox
            .files
            .upload(IncomingFile::new("serverOnly.js", b"let x = 1;".to_vec()), &alice())
            .unwrap();

        let report = filebox.folder_sync.sync(folder.path(), &alice()).unwrap();

        assert!(report.is_complete(), "{:?}", report.failures);
        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].name, "localOnly.png");
        assert_eq!(report.downloaded, vec![folder.path().join("serverOnly.js")]);
        assert_eq!(
            fs::read(folder.path().join("serverOnly.js")).unwrap(),
            b"let x = 1;"
        );
        assert_eq!(
            fs::read(folder.path().join("common.kt")).unwrap(),
            b"local common",
            "name-only sync leaves existing files alone"
        );

        assert!(filebox
            .folder_sync
            .plan(folder.path(), &alice())
            .unwrap()
            .is_in_sync());
    }

    #[test]
    fn test_sync_collects_per_file_failures() {
        let filebox = Filebox::in_memory();
        let folder = TempDir::new().unwrap();
        fs::write(folder.path().join("README"), b"no extension").unwrap();
        fs::write(folder.path().join("ok.kt"), b"fun ok() {}").unwrap();

        let report = filebox.folder_sync.sync(folder.path(), &alice()).unwrap();

        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.name, "README");
        assert_eq!(failure.direction, SyncDirection::Upload);
        assert!(failure.reason.contains("extension"));
    }

    #[test]
    fn test_download_names_are_sanitised() {
        let filebox = Filebox::in_memory();
        let folder = TempDir::new().unwrap();
        filebox
            .files
            .upload(IncomingFile::new("what?.kt", b"q".to_vec()), &alice())
            .unwrap();

        let report = filebox.folder_sync.sync(folder.path(), &alice()).unwrap();

        assert!(report.is_complete(), "{:?}", report.failures);
        assert_eq!(report.downloaded, vec![folder.path().join("what.kt")]);
    }

    #[test]
    fn test_sanitised_download_converges_on_next_sync() {
        let filebox = Filebox::in_memory();
        let folder = TempDir::new().unwrap();
        filebox
            .files
            .upload(IncomingFile::new("what?.kt", b"q".to_vec()), &alice())
            .unwrap();

        filebox.folder_sync.sync(folder.path(), &alice()).unwrap();
        let second = filebox.folder_sync.sync(folder.path(), &alice()).unwrap();

        assert!(second.plan.is_in_sync(), "{:?}", second.plan);
        assert!(second.is_complete(), "{:?}", second.failures);
        let remote: Vec<_> = filebox
            .listing
            .list_for_owner(alice().user_id())
            .unwrap()
            .into_iter()
            .map(|record| record.name)
            .collect();
        assert_eq!(remote, vec!["what?.kt"]);
    }

    #[test]
    fn test_ambiguous_sanitised_names_are_not_mapped() {
        let filebox = Filebox::in_memory();
        let folder = TempDir::new().unwrap();
        fs::write(folder.path().join("a.kt"), b"local").unwrap();
        for name in ["a?.kt", "a*.kt"] {
            filebox
                .files
                .upload(IncomingFile::new(name, b"r".to_vec()), &alice())
                .unwrap();
        }

        let plan = filebox.folder_sync.plan(folder.path(), &alice()).unwrap();

        assert_eq!(plan.to_upload.iter().collect::<Vec<_>>(), vec!["a.kt"]);
        assert_eq!(plan.to_download.len(), 2);
    }

    #[test]
    fn test_plan_does_not_touch_anything() {
        let filebox = Filebox::in_memory();
        let folder = TempDir::new().unwrap();
        fs::write(folder.path().join("a.kt"), b"a").unwrap();
        filebox
            .files
            .upload(IncomingFile::new("b.kt", b"b".to_vec()), &alice())
            .unwrap();

        let plan = filebox.folder_sync.plan(folder.path(), &alice()).unwrap();

        assert_eq!(plan.to_upload.len(), 1);
        assert_eq!(plan.to_download.len(), 1);
        assert!(!folder.path().join("b.kt").exists());
        assert_eq!(filebox.listing.list_for_owner(alice().user_id()).unwrap().len(), 1);
    }
}
