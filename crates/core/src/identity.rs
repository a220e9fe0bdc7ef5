//! Caller identity.
//!
//! Filebox does not authenticate anyone. The identity provider in front of it does, and
//! hands the result to the core as an [`Identity`] passed explicitly into every mutating
//! call. The core trusts the value it is given.

use crate::{FileError, FileResult};
use filebox_types::{NonEmptyText, UserId};

/// An already-authenticated user acting on files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    user_id: UserId,
    user_name: NonEmptyText,
}

impl Identity {
    /// # Errors
    ///
    /// Returns `FileError::Validation` if `user_name` is blank.
    pub fn new(user_id: impl Into<UserId>, user_name: impl AsRef<str>) -> FileResult<Self> {
        let user_name = NonEmptyText::new(user_name)
            .map_err(|_| FileError::Validation("user name cannot be empty".into()))?;
        Ok(Self {
            user_id: user_id.into(),
            user_name,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn user_name(&self) -> &str {
        self.user_name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_trims_name() {
        let identity = Identity::new(7, "  alice ").expect("valid identity");
        assert_eq!(identity.user_id(), UserId::new(7));
        assert_eq!(identity.user_name(), "alice");
    }

    #[test]
    fn test_identity_rejects_blank_name() {
        let err = Identity::new(7, " ").expect_err("blank name");
        assert!(matches!(err, FileError::Validation(_)));
    }
}
