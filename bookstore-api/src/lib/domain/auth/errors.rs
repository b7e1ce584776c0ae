use std::collections::BTreeMap;

use auth::AuthenticationError;
use auth::JwtError;
use thiserror::Error;

use crate::user::errors::UserError;

/// Field-level validation messages keyed by request field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`; the first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl ToString) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn single(field: &str, message: impl ToString) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    /// `Ok(value)` when no message was recorded.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, AuthError> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

/// Failures talking to an external identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FederationError {
    #[error("Identity provider did not answer in time")]
    Timeout,

    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    #[error("Identity provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Identity provider returned an unreadable payload: {0}")]
    InvalidResponse(String),
}

/// Failures submitting a message to the background email queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailQueueError {
    #[error("Email queue is full")]
    Full,

    #[error("Email queue is closed")]
    Closed,
}

/// Errors surfaced by the authentication core.
///
/// Display strings of the client-facing variants are the messages returned
/// over HTTP.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("failed validation")]
    Validation(ValidationErrors),

    #[error("a user with this email address is already registered")]
    DuplicateEmail,

    #[error("invalid or expired activation token")]
    InvalidActivationToken,

    #[error("invalid authentication credentials")]
    InvalidCredentials,

    #[error("your account is not registered with credentials")]
    NotCredentialsAccount,

    #[error("your account is registered with credentials")]
    ProviderConflict,

    #[error("invalid oauth state")]
    InvalidOAuthState,

    #[error("refresh token isn't found in cookies")]
    MissingRefreshToken,

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("Federation error: {0}")]
    Federation(#[from] FederationError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password error: {0}")]
    Password(#[from] auth::PasswordError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Whether the failure is on the server side and must not be detailed
    /// to the client.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Federation(_)
                | AuthError::Token(_)
                | AuthError::Password(_)
                | AuthError::Database(_)
                | AuthError::Unknown(_)
        )
    }
}

impl From<UserError> for AuthError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DuplicateEmail(_) => AuthError::DuplicateEmail,
            UserError::EditConflict(_) => AuthError::EditConflict,
            UserError::NotFound(_) => AuthError::NotFound,
            UserError::DatabaseError(msg) => AuthError::Database(msg),
        }
    }
}

impl From<AuthenticationError> for AuthError {
    fn from(err: AuthenticationError) -> Self {
        match err {
            AuthenticationError::InvalidCredentials => AuthError::InvalidCredentials,
            AuthenticationError::PasswordError(e) => AuthError::Password(e),
            AuthenticationError::JwtError(e) => AuthError::Token(e),
        }
    }
}
