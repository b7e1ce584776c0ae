use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::SessionTokens;
use chrono::Duration;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::FederationError;
use crate::domain::auth::errors::ValidationErrors;
use crate::domain::auth::models::EmailMessage;
use crate::domain::auth::models::EmailTemplate;
use crate::domain::auth::models::ExternalIdentity;
use crate::domain::auth::models::FederatedCallback;
use crate::domain::auth::models::FederatedLoginStart;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::RegisterUserCommand;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::auth::ports::EmailQueue;
use crate::domain::auth::ports::IdentityProvider;
use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserName;
use crate::domain::user::ports::TokenRepository;
use crate::domain::user::ports::UserRepository;
use crate::domain::user::tokens::generate_state;
use crate::domain::user::tokens::ActivationToken;
use crate::domain::user::tokens::TokenScope;

/// Lifetime of the token sent in the welcome email.
const ACTIVATION_TOKEN_TTL_DAYS: i64 = 3;

/// Domain service implementing registration, login, federation and
/// session refresh.
pub struct AuthService<UR, TR, IP, EQ>
where
    UR: UserRepository,
    TR: TokenRepository,
    IP: IdentityProvider,
    EQ: EmailQueue,
{
    users: Arc<UR>,
    tokens: Arc<TR>,
    identity_provider: Arc<IP>,
    email_queue: Arc<EQ>,
    authenticator: Arc<Authenticator>,
}

impl<UR, TR, IP, EQ> AuthService<UR, TR, IP, EQ>
where
    UR: UserRepository,
    TR: TokenRepository,
    IP: IdentityProvider,
    EQ: EmailQueue,
{
    /// Create a new authentication service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User persistence implementation
    /// * `tokens` - Activation token persistence implementation
    /// * `identity_provider` - External OAuth2 provider
    /// * `email_queue` - Background email submission
    /// * `authenticator` - Password checks and session token issuance
    pub fn new(
        users: Arc<UR>,
        tokens: Arc<TR>,
        identity_provider: Arc<IP>,
        email_queue: Arc<EQ>,
        authenticator: Arc<Authenticator>,
    ) -> Self {
        Self {
            users,
            tokens,
            identity_provider,
            email_queue,
            authenticator,
        }
    }

    fn issue_session(&self, user: &User) -> Result<SessionTokens, AuthError> {
        let session = self.authenticator.issue_session(user.id.0)?;
        tracing::debug!(
            user_id = %user.id,
            access_expires_at = %session.access_expires_at,
            "Session issued"
        );
        Ok(session)
    }

    /// Verify a session token and load its subject.
    async fn resolve_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.authenticator.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AuthError::InvalidAuthenticationToken
        })?;

        self.users
            .find_by_id(UserId(claims.sub))
            .await?
            .ok_or_else(|| {
                tracing::debug!(user_id = claims.sub, "Session token subject no longer exists");
                AuthError::InvalidAuthenticationToken
            })
    }

    async fn create_federated_user(&self, identity: ExternalIdentity) -> Result<User, AuthError> {
        let invalid = |field: &str, reason: String| {
            AuthError::Federation(FederationError::InvalidResponse(format!("{field}: {reason}")))
        };

        let email = EmailAddress::new(identity.email).map_err(|e| invalid("email", e.to_string()))?;
        let name = if identity.name.is_empty() {
            UserName::new(email.to_string())
        } else {
            UserName::new(identity.name)
        }
        .map_err(|e| invalid("name", e.to_string()))?;

        let password = self.authenticator.hash_password(&identity.subject_id)?;

        let user = self
            .users
            .create(NewUser {
                name,
                email,
                picture: identity.picture,
                password,
                activated: true,
                auth_provider: AuthProvider::Google,
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            provider = %user.auth_provider,
            "Federated user created"
        );
        Ok(user)
    }
}

#[async_trait]
impl<UR, TR, IP, EQ> AuthServicePort for AuthService<UR, TR, IP, EQ>
where
    UR: UserRepository,
    TR: TokenRepository,
    IP: IdentityProvider,
    EQ: EmailQueue,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<User, AuthError> {
        let password = self
            .authenticator
            .hash_password(command.password.expose())?;

        let user = self
            .users
            .create(NewUser {
                name: command.name,
                email: command.email,
                picture: None,
                password,
                activated: false,
                auth_provider: AuthProvider::Credentials,
            })
            .await?;

        let token = ActivationToken::generate(
            user.id,
            Duration::days(ACTIVATION_TOKEN_TTL_DAYS),
            TokenScope::Activation,
        );
        self.tokens.create(&token).await?;

        let message = EmailMessage {
            recipient: user.email.clone(),
            template: EmailTemplate::UserWelcome {
                user_id: user.id,
                activation_token: token.plaintext,
            },
        };
        if let Err(e) = self.email_queue.enqueue(message) {
            tracing::error!(user_id = %user.id, error = %e, "Failed to queue welcome email");
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn activate(&self, token: &str) -> Result<User, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Validation(ValidationErrors::single(
                "token",
                "must be provided",
            )));
        }

        let mut user = self
            .users
            .find_by_token(TokenScope::Activation, token)
            .await?
            .ok_or(AuthError::InvalidActivationToken)?;

        user.activated = true;
        let user = self.users.update(user).await?;

        self.tokens
            .delete_all_for_user(TokenScope::Activation, user.id)
            .await?;

        tracing::info!(user_id = %user.id, "User activated");
        Ok(user)
    }

    async fn login(&self, command: LoginCommand) -> Result<SessionTokens, AuthError> {
        let user = self
            .users
            .find_by_email(&command.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.auth_provider.is_federated() {
            return Err(AuthError::NotCredentialsAccount);
        }

        let session = self.authenticator.authenticate(
            command.password.expose(),
            &user.password,
            user.id.0,
        )?;

        tracing::info!(user_id = %user.id, "Credential login");
        Ok(session)
    }

    fn begin_federated_login(&self) -> FederatedLoginStart {
        let state = generate_state();
        FederatedLoginStart {
            url: self.identity_provider.authorization_url(&state),
            state,
        }
    }

    async fn complete_federated_login(
        &self,
        callback: FederatedCallback,
    ) -> Result<SessionTokens, AuthError> {
        if !callback.state_matches() {
            tracing::warn!("OAuth callback state mismatch");
            return Err(AuthError::InvalidOAuthState);
        }

        let identity = self.identity_provider.exchange_code(&callback.code).await?;

        let email = EmailAddress::new(identity.email.clone()).map_err(|e| {
            AuthError::Federation(FederationError::InvalidResponse(format!("email: {e}")))
        })?;

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => match self.create_federated_user(identity).await {
                Ok(user) => user,
                // Lost a race with a concurrent first login for the same email
                Err(AuthError::DuplicateEmail) => {
                    tracing::debug!("Federated user created concurrently, reloading");
                    self.users.find_by_email(&email).await?.ok_or_else(|| {
                        AuthError::Unknown("user vanished after duplicate email".to_string())
                    })?
                }
                Err(e) => return Err(e),
            },
        };

        if !user.auth_provider.is_federated() {
            tracing::info!(user_id = %user.id, "Federated login for a credentials account");
            return Err(AuthError::ProviderConflict);
        }

        self.issue_session(&user)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let user = self.resolve_token(refresh_token).await?;
        self.issue_session(&user)
    }

    async fn authenticate_bearer(&self, access_token: &str) -> Result<User, AuthError> {
        self.resolve_token(access_token).await
    }

    async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use auth::PasswordCredential;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::auth::errors::EmailQueueError;
    use crate::domain::user::tokens::hash_token;
    use crate::user::errors::UserError;

    const SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: NewUser) -> Result<User, UserError>;
            async fn update(&self, user: User) -> Result<User, UserError>;
            async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;
            async fn find_by_token(
                &self,
                scope: TokenScope,
                plaintext: &str,
            ) -> Result<Option<User>, UserError>;
        }
    }

    mock! {
        pub TestTokenRepository {}

        #[async_trait]
        impl TokenRepository for TestTokenRepository {
            async fn create(&self, token: &ActivationToken) -> Result<(), UserError>;
            async fn delete_all_for_user(
                &self,
                scope: TokenScope,
                user_id: UserId,
            ) -> Result<(), UserError>;
        }
    }

    mock! {
        pub TestIdentityProvider {}

        #[async_trait]
        impl IdentityProvider for TestIdentityProvider {
            fn authorization_url(&self, state: &str) -> String;
            async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, FederationError>;
        }
    }

    mock! {
        pub TestEmailQueue {}

        impl EmailQueue for TestEmailQueue {
            fn enqueue(&self, message: EmailMessage) -> Result<(), EmailQueueError>;
        }
    }

    struct Mocks {
        users: MockTestUserRepository,
        tokens: MockTestTokenRepository,
        identity_provider: MockTestIdentityProvider,
        email_queue: MockTestEmailQueue,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                users: MockTestUserRepository::new(),
                tokens: MockTestTokenRepository::new(),
                identity_provider: MockTestIdentityProvider::new(),
                email_queue: MockTestEmailQueue::new(),
            }
        }

        fn into_service(
            self,
        ) -> AuthService<
            MockTestUserRepository,
            MockTestTokenRepository,
            MockTestIdentityProvider,
            MockTestEmailQueue,
        > {
            AuthService::new(
                Arc::new(self.users),
                Arc::new(self.tokens),
                Arc::new(self.identity_provider),
                Arc::new(self.email_queue),
                Arc::new(Authenticator::new(SECRET)),
            )
        }
    }

    fn stored(new_user: NewUser, id: i64) -> User {
        User {
            id: UserId(id),
            name: new_user.name,
            email: new_user.email,
            picture: new_user.picture,
            password: new_user.password,
            activated: new_user.activated,
            auth_provider: new_user.auth_provider,
            version: 1,
            created_at: Utc::now(),
        }
    }

    fn existing_user(id: i64, email: &str, provider: AuthProvider, activated: bool) -> User {
        User {
            id: UserId(id),
            name: UserName::new("John".to_string()).unwrap(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            picture: None,
            password: PasswordCredential::set("password123").unwrap(),
            activated,
            auth_provider: provider,
            version: 1,
            created_at: Utc::now(),
        }
    }

    fn login_command(email: &str, password: &str) -> LoginCommand {
        LoginCommand {
            email: EmailAddress::new(email.to_string()).unwrap(),
            password: crate::domain::user::models::PlaintextPassword::new(password.to_string())
                .unwrap(),
        }
    }

    fn google_identity(email: &str) -> ExternalIdentity {
        ExternalIdentity {
            subject_id: "1234567890".to_string(),
            email: email.to_string(),
            name: "Jane".to_string(),
            picture: Some("https://example.com/jane.png".to_string()),
        }
    }

    fn callback(state: &str, expected: &str) -> FederatedCallback {
        FederatedCallback {
            code: "auth-code".to_string(),
            state: state.to_string(),
            expected_state: Some(expected.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut mocks = Mocks::new();

        mocks
            .users
            .expect_create()
            .withf(|user| {
                user.name.as_str() == "John"
                    && user.email.as_str() == "john@x.com"
                    && !user.activated
                    && user.auth_provider == AuthProvider::Credentials
                    && user.password.hash().starts_with("$argon2")
            })
            .times(1)
            .returning(|user| Ok(stored(user, 1)));

        mocks
            .tokens
            .expect_create()
            .withf(|token| {
                token.user_id == UserId(1)
                    && token.scope == TokenScope::Activation
                    && token.hash == hash_token(&token.plaintext)
                    && token.expiry > Utc::now() + Duration::days(2)
            })
            .times(1)
            .returning(|_| Ok(()));

        mocks
            .email_queue
            .expect_enqueue()
            .withf(|message| {
                message.recipient.as_str() == "john@x.com"
                    && matches!(
                        &message.template,
                        EmailTemplate::UserWelcome { user_id, activation_token }
                            if *user_id == UserId(1) && !activation_token.is_empty()
                    )
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = mocks.into_service();
        let command = RegisterUserCommand {
            name: UserName::new("John".to_string()).unwrap(),
            email: EmailAddress::new("john@x.com".to_string()).unwrap(),
            password: crate::domain::user::models::PlaintextPassword::new(
                "password123".to_string(),
            )
            .unwrap(),
        };

        let user = service.register(command).await.unwrap();
        assert_eq!(user.id, UserId(1));
        assert!(!user.activated);
        assert!(user.password.matches("password123").unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut mocks = Mocks::new();

        mocks
            .users
            .expect_create()
            .times(1)
            .returning(|user| Err(UserError::DuplicateEmail(user.email.to_string())));
        mocks.tokens.expect_create().times(0);
        mocks.email_queue.expect_enqueue().times(0);

        let service = mocks.into_service();
        let command = RegisterUserCommand {
            name: UserName::new("John".to_string()).unwrap(),
            email: EmailAddress::new("john@x.com".to_string()).unwrap(),
            password: crate::domain::user::models::PlaintextPassword::new(
                "password123".to_string(),
            )
            .unwrap(),
        };

        let result = service.register(command).await;
        assert_eq!(result.unwrap_err(), AuthError::DuplicateEmail);
    }

    #[tokio::test]
    async fn test_register_survives_full_email_queue() {
        let mut mocks = Mocks::new();

        mocks
            .users
            .expect_create()
            .returning(|user| Ok(stored(user, 3)));
        mocks.tokens.expect_create().returning(|_| Ok(()));
        mocks
            .email_queue
            .expect_enqueue()
            .times(1)
            .returning(|_| Err(EmailQueueError::Full));

        let service = mocks.into_service();
        let command = RegisterUserCommand {
            name: UserName::new("John".to_string()).unwrap(),
            email: EmailAddress::new("john@x.com".to_string()).unwrap(),
            password: crate::domain::user::models::PlaintextPassword::new(
                "password123".to_string(),
            )
            .unwrap(),
        };

        assert!(service.register(command).await.is_ok());
    }

    #[tokio::test]
    async fn test_activate_success() {
        let mut mocks = Mocks::new();
        let user = existing_user(4, "john@x.com", AuthProvider::Credentials, false);

        let returned_user = user.clone();
        mocks
            .users
            .expect_find_by_token()
            .with(eq(TokenScope::Activation), eq("valid-token"))
            .times(1)
            .returning(move |_, _| Ok(Some(returned_user.clone())));

        mocks
            .users
            .expect_update()
            .withf(|user| user.activated && user.version == 1)
            .times(1)
            .returning(|mut user| {
                user.version += 1;
                Ok(user)
            });

        mocks
            .tokens
            .expect_delete_all_for_user()
            .with(eq(TokenScope::Activation), eq(UserId(4)))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = mocks.into_service();

        let activated = service.activate("valid-token").await.unwrap();
        assert!(activated.activated);
        assert_eq!(activated.version, 2);
    }

    #[tokio::test]
    async fn test_activate_unknown_token() {
        let mut mocks = Mocks::new();

        mocks
            .users
            .expect_find_by_token()
            .times(1)
            .returning(|_, _| Ok(None));
        mocks.users.expect_update().times(0);
        mocks.tokens.expect_delete_all_for_user().times(0);

        let service = mocks.into_service();

        let result = service.activate("wrong-token").await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidActivationToken);
    }

    #[tokio::test]
    async fn test_activate_requires_token() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_token().times(0);

        let service = mocks.into_service();

        match service.activate("").await {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors.get("token"), Some("must be provided"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_activate_edit_conflict() {
        let mut mocks = Mocks::new();
        let user = existing_user(4, "john@x.com", AuthProvider::Credentials, false);

        mocks
            .users
            .expect_find_by_token()
            .returning(move |_, _| Ok(Some(user.clone())));
        mocks
            .users
            .expect_update()
            .times(1)
            .returning(|user| Err(UserError::EditConflict(user.id.0)));
        mocks.tokens.expect_delete_all_for_user().times(0);

        let service = mocks.into_service();

        let result = service.activate("valid-token").await;
        assert_eq!(result.unwrap_err(), AuthError::EditConflict);
    }

    #[tokio::test]
    async fn test_login_success_before_activation() {
        let mut mocks = Mocks::new();
        let user = existing_user(9, "john@x.com", AuthProvider::Credentials, false);

        mocks
            .users
            .expect_find_by_email()
            .withf(|email| email.as_str() == "john@x.com")
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = mocks.into_service();

        let session = service
            .login(login_command("john@x.com", "password123"))
            .await
            .unwrap();

        let claims = Authenticator::new(SECRET)
            .verify(&session.access_token)
            .unwrap();
        assert_eq!(claims.sub, 9);
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let service = mocks.into_service();

        let result = service.login(login_command("nobody@x.com", "password123")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut mocks = Mocks::new();
        let user = existing_user(9, "john@x.com", AuthProvider::Credentials, true);
        mocks
            .users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = mocks.into_service();

        let result = service.login(login_command("john@x.com", "wrong-password")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_login_rejects_federated_account() {
        let mut mocks = Mocks::new();
        let user = existing_user(9, "jane@x.com", AuthProvider::Google, true);
        mocks
            .users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = mocks.into_service();

        // Even the password the credential was derived from is refused.
        let result = service.login(login_command("jane@x.com", "password123")).await;
        assert_eq!(result.unwrap_err(), AuthError::NotCredentialsAccount);
    }

    #[tokio::test]
    async fn test_begin_federated_login() {
        let mut mocks = Mocks::new();
        mocks
            .identity_provider
            .expect_authorization_url()
            .times(1)
            .returning(|state| format!("https://accounts.example.com/auth?state={state}"));

        let service = mocks.into_service();

        let start = service.begin_federated_login();
        assert!(!start.state.is_empty());
        assert!(start.url.ends_with(&start.state));
    }

    #[tokio::test]
    async fn test_federated_state_mismatch_skips_provider() {
        let mut mocks = Mocks::new();
        mocks.identity_provider.expect_exchange_code().times(0);
        mocks.users.expect_find_by_email().times(0);

        let service = mocks.into_service();

        let result = service
            .complete_federated_login(callback("forged", "bound"))
            .await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidOAuthState);
    }

    #[tokio::test]
    async fn test_federated_login_creates_new_user() {
        let mut mocks = Mocks::new();

        mocks
            .identity_provider
            .expect_exchange_code()
            .with(eq("auth-code"))
            .times(1)
            .returning(|_| Ok(google_identity("jane@x.com")));
        mocks
            .users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        mocks
            .users
            .expect_create()
            .withf(|user| {
                user.activated
                    && user.auth_provider == AuthProvider::Google
                    && user.name.as_str() == "Jane"
                    && user.picture.as_deref() == Some("https://example.com/jane.png")
                    && user.password.matches("1234567890").unwrap_or(false)
            })
            .times(1)
            .returning(|user| Ok(stored(user, 21)));

        let service = mocks.into_service();

        let session = service
            .complete_federated_login(callback("state", "state"))
            .await
            .unwrap();

        let claims = Authenticator::new(SECRET)
            .verify(&session.access_token)
            .unwrap();
        assert_eq!(claims.sub, 21);
    }

    #[tokio::test]
    async fn test_federated_login_existing_federated_user() {
        let mut mocks = Mocks::new();
        let user = existing_user(21, "jane@x.com", AuthProvider::Google, true);

        mocks
            .identity_provider
            .expect_exchange_code()
            .returning(|_| Ok(google_identity("jane@x.com")));
        mocks
            .users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        mocks.users.expect_create().times(0);

        let service = mocks.into_service();

        let session = service
            .complete_federated_login(callback("state", "state"))
            .await
            .unwrap();
        assert!(!session.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_federated_login_conflicts_with_credentials_account() {
        let mut mocks = Mocks::new();
        let user = existing_user(4, "john@x.com", AuthProvider::Credentials, true);

        mocks
            .identity_provider
            .expect_exchange_code()
            .returning(|_| Ok(google_identity("john@x.com")));
        mocks
            .users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        mocks.users.expect_create().times(0);

        let service = mocks.into_service();

        let result = service
            .complete_federated_login(callback("state", "state"))
            .await;
        assert_eq!(result.unwrap_err(), AuthError::ProviderConflict);
    }

    #[tokio::test]
    async fn test_federated_login_concurrent_first_login() {
        let mut mocks = Mocks::new();
        let user = existing_user(21, "jane@x.com", AuthProvider::Google, true);

        mocks
            .identity_provider
            .expect_exchange_code()
            .returning(|_| Ok(google_identity("jane@x.com")));
        let mut lookups = 0;
        mocks
            .users
            .expect_find_by_email()
            .times(2)
            .returning(move |_| {
                lookups += 1;
                if lookups == 1 {
                    Ok(None)
                } else {
                    Ok(Some(user.clone()))
                }
            });
        mocks
            .users
            .expect_create()
            .times(1)
            .returning(|user| Err(UserError::DuplicateEmail(user.email.to_string())));

        let service = mocks.into_service();

        let session = service
            .complete_federated_login(callback("state", "state"))
            .await
            .unwrap();

        let claims = Authenticator::new(SECRET)
            .verify(&session.access_token)
            .unwrap();
        assert_eq!(claims.sub, 21);
    }

    #[tokio::test]
    async fn test_federated_login_race_with_credentials_signup() {
        let mut mocks = Mocks::new();
        let user = existing_user(4, "jane@x.com", AuthProvider::Credentials, false);

        mocks
            .identity_provider
            .expect_exchange_code()
            .returning(|_| Ok(google_identity("jane@x.com")));
        let mut lookups = 0;
        mocks
            .users
            .expect_find_by_email()
            .times(2)
            .returning(move |_| {
                lookups += 1;
                if lookups == 1 {
                    Ok(None)
                } else {
                    Ok(Some(user.clone()))
                }
            });
        mocks
            .users
            .expect_create()
            .returning(|user| Err(UserError::DuplicateEmail(user.email.to_string())));

        let service = mocks.into_service();

        let result = service
            .complete_federated_login(callback("state", "state"))
            .await;
        assert_eq!(result.unwrap_err(), AuthError::ProviderConflict);
    }

    #[tokio::test]
    async fn test_federated_exchange_failure() {
        let mut mocks = Mocks::new();
        mocks
            .identity_provider
            .expect_exchange_code()
            .returning(|_| Err(FederationError::Timeout));
        mocks.users.expect_find_by_email().times(0);

        let service = mocks.into_service();

        let result = service
            .complete_federated_login(callback("state", "state"))
            .await;
        assert_eq!(
            result.unwrap_err(),
            AuthError::Federation(FederationError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_refresh_issues_new_session() {
        let mut mocks = Mocks::new();
        let user = existing_user(9, "john@x.com", AuthProvider::Credentials, true);

        mocks
            .users
            .expect_find_by_id()
            .with(eq(UserId(9)))
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = mocks.into_service();
        let previous = Authenticator::new(SECRET).issue_session(9).unwrap();

        let session = service.refresh(&previous.refresh_token).await.unwrap();
        assert!(session.access_expires_at >= previous.access_expires_at);
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_and_malformed_tokens() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_id().times(0);

        let service = mocks.into_service();
        let expired = Authenticator::new(SECRET)
            .issue(9, Utc::now().timestamp() - 10)
            .unwrap();

        assert_eq!(
            service.refresh(&expired).await.unwrap_err(),
            AuthError::InvalidAuthenticationToken
        );
        assert_eq!(
            service.refresh("not-a-token").await.unwrap_err(),
            AuthError::InvalidAuthenticationToken
        );
        assert_eq!(
            service.refresh("").await.unwrap_err(),
            AuthError::MissingRefreshToken
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_deleted_user() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_id().returning(|_| Ok(None));

        let service = mocks.into_service();
        let session = Authenticator::new(SECRET).issue_session(9).unwrap();

        assert_eq!(
            service.refresh(&session.refresh_token).await.unwrap_err(),
            AuthError::InvalidAuthenticationToken
        );
    }

    #[tokio::test]
    async fn test_authenticate_bearer() {
        let mut mocks = Mocks::new();
        let user = existing_user(9, "john@x.com", AuthProvider::Credentials, true);
        mocks
            .users
            .expect_find_by_id()
            .with(eq(UserId(9)))
            .returning(move |_| Ok(Some(user.clone())));

        let service = mocks.into_service();
        let session = Authenticator::new(SECRET).issue_session(9).unwrap();

        let user = service
            .authenticate_bearer(&session.access_token)
            .await
            .unwrap();
        assert_eq!(user.id, UserId(9));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_find_by_id()
            .with(eq(UserId(77)))
            .times(1)
            .returning(|_| Ok(None));

        let service = mocks.into_service();

        assert_eq!(
            service.get_user(UserId(77)).await.unwrap_err(),
            AuthError::NotFound
        );
    }
}
