use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid user id: {0}")]
    InvalidFormat(String),
}

/// Error for display name validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("must be provided")]
    Missing,

    #[error("must not be more than {max} bytes long")]
    TooLong { max: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("must be provided")]
    Missing,

    #[error("must be a valid email address")]
    InvalidFormat,
}

/// Error for plaintext password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("must be provided")]
    Missing,

    #[error("must be at least {min} bytes long")]
    TooShort { min: usize },

    #[error("must not be more than {max} bytes long")]
    TooLong { max: usize },
}

/// Error for unknown provider tags read back from storage
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown authentication provider: {0}")]
pub struct AuthProviderError(pub String);

/// Errors raised by the user and token stores
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Edit conflict on user {0}")]
    EditConflict(i64),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        UserError::DatabaseError(err.to_string())
    }
}
