//! Authentication utilities library
//!
//! Provides the stateless session protocol used by the book store API:
//! - Password credentials (Argon2id)
//! - HS256 session tokens carrying `{sub, exp, iat}`
//! - Access/refresh token issuance under a lifetime policy
//!
//! # Examples
//!
//! ## Password Credentials
//! ```
//! use auth::PasswordCredential;
//!
//! let credential = PasswordCredential::set("my_password").unwrap();
//! assert!(credential.matches("my_password").unwrap());
//! assert!(!credential.matches("not_my_password").unwrap());
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::Authenticator;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!");
//!
//! let session = auth.issue_session(42).unwrap();
//! let claims = auth.verify(&session.access_token).unwrap();
//! assert_eq!(claims.sub, 42);
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::SessionTokens;
pub use authenticator::TokenPolicy;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordCredential;
pub use password::PasswordError;
pub use password::PasswordHasher;
