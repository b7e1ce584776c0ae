use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

use crate::user::models::UserId;

/// Purpose an opaque user token was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Activation,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use token delivered out of band (welcome email).
///
/// Only `hash` is persisted; `plaintext` exists in memory just long enough
/// to be handed to the mailer.
#[derive(Clone, PartialEq, Eq)]
pub struct ActivationToken {
    pub plaintext: String,
    pub hash: Vec<u8>,
    pub user_id: UserId,
    pub expiry: DateTime<Utc>,
    pub scope: TokenScope,
}

impl ActivationToken {
    const ENTROPY_BYTES: usize = 16;

    /// Mint a fresh token for `user_id` valid for `ttl`.
    pub fn generate(user_id: UserId, ttl: Duration, scope: TokenScope) -> Self {
        let plaintext = random_url_safe(Self::ENTROPY_BYTES);

        Self {
            hash: hash_token(&plaintext),
            plaintext,
            user_id,
            expiry: Utc::now() + ttl,
            scope,
        }
    }
}

impl fmt::Debug for ActivationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationToken")
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// SHA-256 digest used as the storage key of a token plaintext.
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// OAuth `state` value binding a consent redirect to the browser that
/// started it.
pub fn generate_state() -> String {
    random_url_safe(24)
}

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
