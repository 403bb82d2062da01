//! Owners of annotation graph blobs.
//!
//! A blob belongs either to a real annotator (by username) or to the
//! reserved baseline pseudo-user whose graph is materialized straight from
//! the uploaded source document.

use std::fmt;

use crate::error::CoreError;

/// Reserved username of the baseline pseudo-user. Never a real annotator.
pub const BASELINE_IDENTITY: &str = "INITIAL_CAS";

/// Maximum accepted username length. The blob file name `{username}.json`
/// must stay within the 255-byte file-name limit.
pub const MAX_USERNAME_LEN: usize = 250;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// The baseline graph shared as the source of every user's first copy.
    Baseline,
    /// A real annotator.
    User(String),
}

impl Identity {
    /// Build a user identity, rejecting names that cannot be used as a blob
    /// key or that collide with the baseline pseudo-user.
    pub fn user(username: &str) -> Result<Self, CoreError> {
        validate_username(username)?;
        Ok(Self::User(username.to_string()))
    }

    /// The name used as the blob key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Baseline => BASELINE_IDENTITY,
            Self::User(name) => name,
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Baseline)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that `username` is usable as an annotator identity.
///
/// - non-empty and at most [`MAX_USERNAME_LEN`] bytes
/// - a single path component (no `/`, `\`, NUL, and not `.` or `..`)
/// - not the reserved [`BASELINE_IDENTITY`]
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.trim().is_empty() {
        return Err(CoreError::Validation("Username must not be empty".into()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Username exceeds {MAX_USERNAME_LEN} bytes"
        )));
    }
    if username == "." || username == ".." || username.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!(
            "Username '{username}' is not a valid blob key"
        )));
    }
    if username == BASELINE_IDENTITY {
        return Err(CoreError::InvariantViolation(format!(
            "'{BASELINE_IDENTITY}' is reserved for the baseline graph"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn user_identity_round_trips_name() {
        let identity = Identity::user("alice").unwrap();
        assert_eq!(identity.as_str(), "alice");
        assert!(!identity.is_baseline());
    }

    #[test]
    fn baseline_uses_reserved_name() {
        assert_eq!(Identity::Baseline.as_str(), BASELINE_IDENTITY);
        assert_eq!(Identity::Baseline.to_string(), "INITIAL_CAS");
    }

    #[test]
    fn reserved_name_is_not_a_user() {
        assert_matches!(
            Identity::user(BASELINE_IDENTITY),
            Err(CoreError::InvariantViolation(_))
        );
    }

    #[test]
    fn path_like_names_rejected() {
        for name in ["", "  ", "..", ".", "a/b", "a\\b"] {
            assert_matches!(Identity::user(name), Err(CoreError::Validation(_)), "{name:?}");
        }
    }

    #[test]
    fn overlong_name_rejected() {
        let name = "x".repeat(MAX_USERNAME_LEN + 1);
        assert_matches!(Identity::user(&name), Err(CoreError::Validation(_)));
    }

    #[test]
    fn longest_name_still_fits_a_blob_file_name() {
        let name = "x".repeat(MAX_USERNAME_LEN);
        let identity = Identity::user(&name).unwrap();
        assert!(format!("{identity}.json").len() <= 255);
    }
}
