//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Nothing in this crate reads environment variables during request handling; binaries read
//! the environment and hand the raw values to the helpers below.

use crate::constants::{BLOBS_DIR_NAME, DEFAULT_MAX_UPLOAD_BYTES, METADATA_FILENAME};
use crate::{FileError, FileResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    max_upload_bytes: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Validation` if `max_upload_bytes` is zero or `data_dir` is empty.
    pub fn new(data_dir: PathBuf, max_upload_bytes: usize) -> FileResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(FileError::Validation("data_dir cannot be empty".into()));
        }
        if max_upload_bytes == 0 {
            return Err(FileError::Validation(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            max_upload_bytes,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join(BLOBS_DIR_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILENAME)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}

/// Parse the maximum upload size from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_UPLOAD_BYTES`].
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> FileResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(v) => match v.parse::<usize>() {
            Ok(0) | Err(_) => Err(FileError::Validation(format!(
                "max upload size must be a positive byte count, got '{v}'"
            ))),
            Ok(bytes) => Ok(bytes),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths_derive_from_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/filebox"), 1024).unwrap();

        assert_eq!(cfg.data_dir(), Path::new("/srv/filebox"));
        assert_eq!(cfg.blobs_dir(), PathBuf::from("/srv/filebox/blobs"));
        assert_eq!(
            cfg.metadata_path(),
            PathBuf::from("/srv/filebox/metadata.json")
        );
        assert_eq!(cfg.max_upload_bytes(), 1024);
    }

    #[test]
    fn test_config_rejects_zero_limit() {
        let err = CoreConfig::new(PathBuf::from("data"), 0).expect_err("zero limit");
        assert!(matches!(err, FileError::Validation(_)));
    }

    #[test]
    fn test_max_upload_bytes_defaults_when_unset() {
        assert_eq!(
            max_upload_bytes_from_env_value(None).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
        assert_eq!(
            max_upload_bytes_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
    }

    #[test]
    fn test_max_upload_bytes_parses_value() {
        assert_eq!(
            max_upload_bytes_from_env_value(Some(" 2048 ".into())).unwrap(),
            2048
        );
        assert!(max_upload_bytes_from_env_value(Some("lots".into())).is_err());
        assert!(max_upload_bytes_from_env_value(Some("0".into())).is_err());
    }
}
