//! Blob keys.

use crate::constants::RANDOM_HEX_LEN;
use crate::FilesError;
use filebox_types::UserId;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Reference to a stored blob: `<owner>_<32 lowercase hex>`.
///
/// The owner id keeps keys attributable during manual inspection and the random component
/// guarantees two writers never pick the same key. A `BlobRef` is only ever constructed in
/// its canonical form, so it is safe to join onto a storage root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobRef {
    key: String,
    owner: UserId,
}

impl BlobRef {
    /// Generates a fresh reference for `owner`.
    pub fn generate(owner: UserId) -> Self {
        Self {
            key: format!("{}_{}", owner, Uuid::new_v4().simple()),
            owner,
        }
    }

    /// Validates an externally supplied reference.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidBlobRef`] unless `input` is `<i64>_<32 lowercase hex>`.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let invalid = || FilesError::InvalidBlobRef(input.to_owned());

        let (owner, random) = input.split_once('_').ok_or_else(invalid)?;
        let owner_id = owner.parse::<i64>().map_err(|_| invalid())?;
        if owner.starts_with('+') || !is_random_part(random) {
            return Err(invalid());
        }

        Ok(Self {
            key: input.to_owned(),
            owner: UserId::new(owner_id),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Owner id embedded in the key.
    pub fn owner(&self) -> UserId {
        self.owner
    }

    fn random_part(&self) -> &str {
        &self.key[self.key.len() - RANDOM_HEX_LEN..]
    }

    /// Returns `root/<s1>/<s2>/<ref>` where `s1`/`s2` are the first four hex characters of
    /// the random component.
    pub fn sharded_path(&self, root: &Path) -> PathBuf {
        let random = self.random_part();
        root.join(&random[0..2]).join(&random[2..4]).join(&self.key)
    }
}

fn is_random_part(input: &str) -> bool {
    input.len() == RANDOM_HEX_LEN
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl FromStr for BlobRef {
    type Err = FilesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for BlobRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.key)
    }
}

impl<'de> serde::Deserialize<'de> for BlobRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BlobRef::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_embeds_owner() {
        let blob = BlobRef::generate(UserId::new(42));
        assert!(blob.as_str().starts_with("42_"));
        assert_eq!(blob.owner(), UserId::new(42));
        assert_eq!(blob.as_str().len(), 3 + RANDOM_HEX_LEN);
    }

    #[test]
    fn test_generate_is_unique() {
        let a = BlobRef::generate(UserId::new(1));
        let b = BlobRef::generate(UserId::new(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_generated() {
        let blob = BlobRef::generate(UserId::new(-7));
        let parsed = BlobRef::parse(blob.as_str()).expect("generated ref should parse");
        assert_eq!(parsed, blob);
        assert_eq!(parsed.owner(), UserId::new(-7));
    }

    #[test]
    fn test_parse_reads_owner() {
        let blob = BlobRef::parse("-12_0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(blob.owner(), UserId::new(-12));
        assert_eq!(blob.to_string(), "-12_0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_parse_rejects_traversal_and_garbage() {
        for input in [
            "",
            "42",
            "42_",
            "../etc/passwd",
            "42_../../../../../../../../../../../",
            "abc_0123456789abcdef0123456789abcdef",
            "42_0123456789ABCDEF0123456789ABCDEF",
            "42_0123456789abcdef0123456789abcdef0",
            "+4_0123456789abcdef0123456789abcdef",
        ] {
            assert!(
                matches!(BlobRef::parse(input), Err(FilesError::InvalidBlobRef(_))),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_sharded_path_uses_random_prefix() {
        let blob = BlobRef::parse("9_abcdef0123456789abcdef0123456789").unwrap();
        let path = blob.sharded_path(Path::new("/data/blobs"));
        assert_eq!(
            path,
            PathBuf::from("/data/blobs/ab/cd/9_abcdef0123456789abcdef0123456789")
        );
    }
}
