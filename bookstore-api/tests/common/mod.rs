use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use auth::Authenticator;
use bookstore_api::domain::auth::errors::FederationError;
use bookstore_api::domain::auth::models::EmailMessage;
use bookstore_api::domain::auth::models::EmailTemplate;
use bookstore_api::domain::auth::models::ExternalIdentity;
use bookstore_api::domain::auth::ports::IdentityProvider;
use bookstore_api::domain::auth::service::AuthService;
use bookstore_api::inbound::http::router::create_router;
use bookstore_api::outbound::email::DispatcherConfig;
use bookstore_api::outbound::email::EmailDispatcher;
use bookstore_api::outbound::email::EmailSender;
use bookstore_api::outbound::repositories::InMemoryTokenRepository;
use bookstore_api::outbound::repositories::InMemoryUserRepository;
use rand::Rng;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server over in-memory stores
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub users: InMemoryUserRepository,
    pub identity_provider: Arc<StubIdentityProvider>,
    pub mailbox: Arc<RecordingEmailSender>,
    pub authenticator: Arc<Authenticator>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let tokens = InMemoryTokenRepository::new();
        let users = InMemoryUserRepository::new(tokens.clone());
        let identity_provider = Arc::new(StubIdentityProvider::default());
        let mailbox = Arc::new(RecordingEmailSender::default());
        let authenticator = Arc::new(Authenticator::new(JWT_SECRET));

        let (email_dispatcher, _worker) = EmailDispatcher::spawn(
            mailbox.clone(),
            DispatcherConfig {
                capacity: 16,
                max_attempts: 3,
                retry_backoff: Duration::from_millis(5),
            },
        );

        let auth_service = Arc::new(AuthService::new(
            Arc::new(users.clone()),
            Arc::new(tokens),
            identity_provider.clone(),
            Arc::new(email_dispatcher),
            authenticator.clone(),
        ));

        let router = create_router(auth_service, false, "test");

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            // Cookies are passed explicitly so each test controls them
            api_client: reqwest::Client::builder()
                .build()
                .expect("Failed to create reqwest client"),
            users,
            identity_provider,
            mailbox,
            authenticator,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register a user and return the response body
    pub async fn register(&self, name: &str, email: &str, password: &str) -> serde_json::Value {
        let response = self
            .post("/auth/register")
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        response.json().await.expect("Failed to parse response")
    }

    /// Log in and return the response
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/auth/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Wait for the welcome email sent to `email` and return its token
    pub async fn activation_token_for(&self, email: &str) -> String {
        for _ in 0..100 {
            if let Some(token) = self.mailbox.activation_token_for(email) {
                return token;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No welcome email delivered to {email}");
    }

    /// Start a federated login; returns the state bound in the cookie
    pub async fn begin_google_login(&self) -> String {
        let response = self
            .get("/auth/google")
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        cookie_value(&response, "oauth_state").expect("Missing oauth_state cookie")
    }

    /// Hit the federation callback with the given cookie-bound state
    pub async fn google_callback(
        &self,
        code: &str,
        state: &str,
        bound_state: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .get("/auth/google/callback")
            .query(&[("code", code), ("state", state)]);
        if let Some(bound) = bound_state {
            request = request.header(reqwest::header::COOKIE, format!("oauth_state={bound}"));
        }
        request.send().await.expect("Failed to execute request")
    }
}

/// Value of the cookie `name` set by `response`, if any
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

/// Full `Set-Cookie` header for `name`, if any
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// Identity provider returning a canned identity and counting exchanges
pub struct StubIdentityProvider {
    identity: Mutex<Result<ExternalIdentity, FederationError>>,
    exchanges: AtomicUsize,
}

impl Default for StubIdentityProvider {
    fn default() -> Self {
        Self {
            identity: Mutex::new(Err(FederationError::Transport(
                "no identity configured".to_string(),
            ))),
            exchanges: AtomicUsize::new(0),
        }
    }
}

impl StubIdentityProvider {
    pub fn respond_with(&self, identity: Result<ExternalIdentity, FederationError>) {
        *self.identity.lock().unwrap() = identity;
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.example.test/o/oauth2/auth?state={state}")
    }

    async fn exchange_code(&self, _code: &str) -> Result<ExternalIdentity, FederationError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.identity.lock().unwrap().clone()
    }
}

/// Email sender that keeps every delivered message
#[derive(Default)]
pub struct RecordingEmailSender {
    delivered: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn delivered(&self) -> Vec<EmailMessage> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn activation_token_for(&self, email: &str) -> Option<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .find(|message| message.recipient.as_str() == email)
            .map(|message| match &message.template {
                EmailTemplate::UserWelcome {
                    activation_token, ..
                } => activation_token.clone(),
            })
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Throwaway PostgreSQL database with migrations applied
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    admin_url: String,
}

impl TestDb {
    /// Create a uniquely named database on the server at `DATABASE_URL`.
    ///
    /// Returns `None` when `DATABASE_URL` is not set so the SQL suite can be
    /// skipped on machines without PostgreSQL.
    pub async fn new() -> Option<Self> {
        let Ok(admin_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        };

        let db_name = format!(
            "test_bookstore_{:016x}",
            rand::thread_rng().gen::<u64>()
        );

        let mut conn = PgConnection::connect(&admin_url)
            .await
            .expect("Failed to connect to Postgres");

        conn.execute(format!(r#"CREATE DATABASE "{}";"#, db_name).as_str())
            .await
            .expect("Failed to create test database");

        let options = admin_url
            .parse::<PgConnectOptions>()
            .expect("Failed to parse DATABASE_URL")
            .database(&db_name);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self {
            pool,
            db_name,
            admin_url,
        })
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        // Database cleanup happens asynchronously
        let db_name = self.db_name.clone();
        let admin_url = self.admin_url.clone();
        let pool = self.pool.clone();
        tokio::spawn(async move {
            pool.close().await;
            if let Ok(mut conn) = PgConnection::connect(&admin_url).await {
                // Terminate existing connections
                let _ = conn
                    .execute(
                        format!(
                            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                             WHERE datname = '{}';",
                            db_name
                        )
                        .as_str(),
                    )
                    .await;

                let _ = conn
                    .execute(format!(r#"DROP DATABASE IF EXISTS "{}";"#, db_name).as_str())
                    .await;
            }
        });
    }
}
