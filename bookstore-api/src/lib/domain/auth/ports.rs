use async_trait::async_trait;
use auth::SessionTokens;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::EmailQueueError;
use crate::domain::auth::errors::FederationError;
use crate::domain::auth::models::EmailMessage;
use crate::domain::auth::models::ExternalIdentity;
use crate::domain::auth::models::FederatedCallback;
use crate::domain::auth::models::FederatedLoginStart;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::RegisterUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Port for the authentication core consumed by the HTTP layer.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Create an inactive credentials account and queue its welcome email.
    ///
    /// # Arguments
    /// * `command` - Validated name, email and password
    ///
    /// # Returns
    /// Created user entity
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    /// * `Password` - Hashing failed
    /// * `Database` - Store operation failed
    async fn register(&self, command: RegisterUserCommand) -> Result<User, AuthError>;

    /// Activate the owner of an activation token.
    ///
    /// # Errors
    /// * `Validation` - Token is empty
    /// * `InvalidActivationToken` - Token is unknown or expired
    /// * `EditConflict` - User was modified concurrently
    /// * `Database` - Store operation failed
    async fn activate(&self, token: &str) -> Result<User, AuthError>;

    /// Credential login.
    ///
    /// # Returns
    /// Access and refresh token pair
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `NotCredentialsAccount` - Account was created through federation
    /// * `Token` - Token issuance failed
    async fn login(&self, command: LoginCommand) -> Result<SessionTokens, AuthError>;

    /// Start a federated login: consent URL plus a fresh state value.
    fn begin_federated_login(&self) -> FederatedLoginStart;

    /// Finish a federated login, creating the account on first use.
    ///
    /// # Errors
    /// * `InvalidOAuthState` - Echoed state does not match the bound one
    /// * `Federation` - Code exchange failed
    /// * `ProviderConflict` - Email belongs to a credentials account
    async fn complete_federated_login(
        &self,
        callback: FederatedCallback,
    ) -> Result<SessionTokens, AuthError>;

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    /// * `InvalidAuthenticationToken` - Token is invalid, expired, or its
    ///   subject no longer exists
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError>;

    /// Resolve a bearer access token to its user.
    ///
    /// # Errors
    /// * `InvalidAuthenticationToken` - Token is invalid, expired, or its
    ///   subject no longer exists
    async fn authenticate_bearer(&self, access_token: &str) -> Result<User, AuthError>;

    /// Retrieve user by unique identifier.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    async fn get_user(&self, id: UserId) -> Result<User, AuthError>;
}

/// Port for an external OAuth2 identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Consent URL carrying `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Trade an authorization code for the user's profile.
    ///
    /// # Errors
    /// * `Timeout` - Provider did not answer in time
    /// * `Transport` - Network failure
    /// * `Provider` - Non-success status from the provider
    /// * `InvalidResponse` - Payload could not be parsed
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, FederationError>;
}

/// Port for fire-and-forget email submission.
pub trait EmailQueue: Send + Sync + 'static {
    /// Submit without waiting; delivery happens in the background.
    ///
    /// # Errors
    /// * `Full` - Queue is at capacity, message dropped
    /// * `Closed` - Worker has stopped
    fn enqueue(&self, message: EmailMessage) -> Result<(), EmailQueueError>;
}
