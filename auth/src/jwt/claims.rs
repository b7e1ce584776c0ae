use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Session claims carried by access and refresh tokens.
///
/// Both token kinds share this payload; they differ only in lifetime.
/// Validity is decided by signature and `exp` alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (numeric user identifier)
    pub sub: i64,

    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,

    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
}

impl Claims {
    /// Create claims for a user expiring at an absolute timestamp.
    ///
    /// # Arguments
    /// * `user_id` - User identifier stored in `sub`
    /// * `expires_at` - Unix timestamp stored in `exp`
    pub fn new(user_id: i64, expires_at: i64) -> Self {
        Self {
            sub: user_id,
            exp: expires_at,
            iat: Utc::now().timestamp(),
        }
    }
}
