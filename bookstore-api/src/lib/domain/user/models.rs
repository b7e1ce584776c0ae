use std::fmt;
use std::str::FromStr;

use auth::PasswordCredential;
use chrono::DateTime;
use chrono::Utc;

use crate::user::errors::AuthProviderError;
use crate::user::errors::EmailError;
use crate::user::errors::NameError;
use crate::user::errors::PasswordError;
use crate::user::errors::UserIdError;

/// User aggregate entity.
///
/// Represents a registered account, created either through credential
/// registration or a first federated login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: UserName,
    pub email: EmailAddress,
    pub picture: Option<String>,
    pub password: PasswordCredential,
    pub activated: bool,
    pub auth_provider: AuthProvider,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// User record before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: UserName,
    pub email: EmailAddress,
    pub picture: Option<String>,
    pub password: PasswordCredential,
    pub activated: bool,
    pub auth_provider: AuthProvider,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl UserId {
    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a positive integer
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        match s.parse::<i64>() {
            Ok(id) if id > 0 => Ok(UserId(id)),
            _ => Err(UserIdError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name value type
///
/// Must be non-empty and at most 500 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    const MAX_LENGTH: usize = 500;

    /// Create a new valid display name.
    ///
    /// # Errors
    /// * `Missing` - Name is empty
    /// * `TooLong` - Name is longer than 500 bytes
    pub fn new(name: String) -> Result<Self, NameError> {
        if name.is_empty() {
            Err(NameError::Missing)
        } else if name.len() > Self::MAX_LENGTH {
            Err(NameError::TooLong {
                max: Self::MAX_LENGTH,
            })
        } else {
            Ok(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser. Compared
/// case-sensitively, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `Missing` - Email is empty
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        if email.is_empty() {
            return Err(EmailError::Missing);
        }

        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|_| EmailError::InvalidFormat)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password accepted from a client, 8 to 72 bytes.
///
/// Never printed; dropped as soon as it has been hashed or checked.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextPassword(String);

impl PlaintextPassword {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 72;

    /// # Errors
    /// * `Missing` - Password is empty
    /// * `TooShort` - Password is shorter than 8 bytes
    /// * `TooLong` - Password is longer than 72 bytes
    pub fn new(password: String) -> Result<Self, PasswordError> {
        let length = password.len();
        if length == 0 {
            Err(PasswordError::Missing)
        } else if length < Self::MIN_LENGTH {
            Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PasswordError::TooLong {
                max: Self::MAX_LENGTH,
            })
        } else {
            Ok(Self(password))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlaintextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextPassword(<redacted>)")
    }
}

/// Provider tag recording how an account was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProvider {
    Credentials,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Credentials => "credentials",
            AuthProvider::Google => "google",
        }
    }

    /// Whether the account was created through an external identity provider.
    pub fn is_federated(&self) -> bool {
        !matches!(self, AuthProvider::Credentials)
    }
}

impl FromStr for AuthProvider {
    type Err = AuthProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" => Ok(AuthProvider::Credentials),
            "google" => Ok(AuthProvider::Google),
            other => Err(AuthProviderError(other.to_string())),
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
