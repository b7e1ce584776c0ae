use async_trait::async_trait;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::tokens::ActivationToken;
use crate::domain::user::tokens::TokenScope;
use crate::user::errors::UserError;

/// Port for user persistence operations.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user and return it with its assigned id and version 1.
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: NewUser) -> Result<User, UserError>;

    /// Write back a modified user if its version still matches the stored one.
    ///
    /// # Returns
    /// The user with its version incremented
    ///
    /// # Errors
    /// * `EditConflict` - Row is missing or was changed concurrently
    /// * `DatabaseError` - Database operation failed
    async fn update(&self, user: User) -> Result<User, UserError>;

    /// Find user by unique identifier.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError>;

    /// Find user by exact email address.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;

    /// Find the owner of an unexpired token with the given scope.
    ///
    /// # Arguments
    /// * `scope` - Token purpose
    /// * `plaintext` - Token as delivered to the user (hashed before lookup)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_token(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Option<User>, UserError>;
}

/// Port for opaque token persistence.
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    /// Store the hash of a freshly minted token.
    async fn create(&self, token: &ActivationToken) -> Result<(), UserError>;

    /// Remove every token of `scope` belonging to `user_id`.
    async fn delete_all_for_user(&self, scope: TokenScope, user_id: UserId)
        -> Result<(), UserError>;
}
