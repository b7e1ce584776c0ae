use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordCredential;
use crate::password::PasswordError;

/// Lifetimes applied to issued session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for TokenPolicy {
    /// 24 hour access tokens, 7 day refresh tokens.
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::hours(24),
            refresh_token_ttl: Duration::days(7),
        }
    }
}

/// Access and refresh token pair issued for one authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// Short-lived bearer token
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    /// Longer-lived token delivered as a cookie
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl SessionTokens {
    /// Remaining refresh token lifetime measured from `now`.
    pub fn refresh_max_age(&self, now: DateTime<Utc>) -> Duration {
        (self.refresh_expires_at - now).max(Duration::zero())
    }
}

/// Authentication operation errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

/// Authentication coordinator combining password verification and JWT generation.
///
/// Holds the single shared signing secret and the token lifetime policy.
pub struct Authenticator {
    jwt_handler: JwtHandler,
    policy: TokenPolicy,
}

impl Authenticator {
    /// Create a new authenticator with the default token policy.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self::with_policy(jwt_secret, TokenPolicy::default())
    }

    /// Create a new authenticator with explicit token lifetimes.
    pub fn with_policy(jwt_secret: &[u8], policy: TokenPolicy) -> Self {
        Self {
            jwt_handler: JwtHandler::new(jwt_secret),
            policy,
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Hash a password into a storable credential.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<PasswordCredential, PasswordError> {
        PasswordCredential::set(password)
    }

    /// Verify a password and issue a session on success.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `credential` - Stored credential
    /// * `user_id` - Subject of the issued tokens
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored credential could not be checked
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        credential: &PasswordCredential,
        user_id: i64,
    ) -> Result<SessionTokens, AuthenticationError> {
        if !credential.matches(password)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_session(user_id)?)
    }

    /// Sign a token for `user_id` expiring at `expires_at` (Unix seconds).
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue(&self, user_id: i64, expires_at: i64) -> Result<String, JwtError> {
        self.jwt_handler.encode(&Claims::new(user_id, expires_at))
    }

    /// Issue an access and refresh token pair without password verification.
    ///
    /// Used once the caller has been authenticated by other means
    /// (federation, refresh).
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_session(&self, user_id: i64) -> Result<SessionTokens, JwtError> {
        let now = Utc::now();
        let access_expires_at = now + self.policy.access_token_ttl;
        let refresh_expires_at = now + self.policy.refresh_token_ttl;

        let claims = |expires_at: DateTime<Utc>| Claims {
            sub: user_id,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        Ok(SessionTokens {
            access_token: self.jwt_handler.encode(&claims(access_expires_at))?,
            access_expires_at,
            refresh_token: self.jwt_handler.encode(&claims(refresh_expires_at))?,
            refresh_expires_at,
        })
    }

    /// Validate and decode a session token.
    ///
    /// # Errors
    /// * `InvalidSignature` - Signature or algorithm mismatch
    /// * `Expired` - Token has expired
    /// * `Malformed` - Token cannot be parsed
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        self.jwt_handler.decode(token)
    }
}
