use std::fmt;

use super::argon2::PasswordHasher;
use super::errors::PasswordError;

/// One-way password credential bound to a user.
///
/// Holds only the PHC hash. The plaintext given to [`PasswordCredential::set`]
/// is never retained, and `Debug` output never includes the hash.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredential {
    hash: String,
}

impl PasswordCredential {
    /// Hash `plaintext` into a new credential.
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    pub fn set(plaintext: &str) -> Result<Self, PasswordError> {
        PasswordHasher::new()
            .hash(plaintext)
            .map(|hash| Self { hash })
    }

    /// Rebuild a credential from a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Check `plaintext` against the stored hash.
    ///
    /// # Returns
    /// `Ok(false)` on a normal mismatch
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is malformed
    pub fn matches(&self, plaintext: &str) -> Result<bool, PasswordError> {
        PasswordHasher::new().verify(plaintext, &self.hash)
    }

    /// Stored PHC hash string.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordCredential(<redacted>)")
    }
}
