use std::env;

use anyhow::bail;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Signing secret committed in `config/development.toml`.
const DEVELOPMENT_JWT_SECRET: &str = "development-secret-change-me-please-32b";
/// Shortest signing secret accepted in production (HS256 key size).
const MIN_PRODUCTION_SECRET_BYTES: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub environment: String,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub oauth: OAuthConfig,
    pub cookie: CookieConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub shutdown_grace_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfig {
    pub google: GoogleOAuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CookieConfig {
    pub secure: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub sender: String,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, OAUTH__GOOGLE__CLIENT_ID, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .set_default("environment", run_mode.as_str())?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_seconds", 3)?
            .set_default("server.shutdown_grace_seconds", 5)?
            .set_default("jwt.access_token_ttl_minutes", 24 * 60)?
            .set_default("jwt.refresh_token_ttl_days", 7)?
            .set_default("oauth.google.auth_url", "https://accounts.google.com/o/oauth2/auth")?
            .set_default("oauth.google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default(
                "oauth.google.userinfo_url",
                "https://www.googleapis.com/oauth2/v3/userinfo",
            )?
            .set_default("oauth.google.timeout_seconds", 5)?
            .set_default("cookie.secure", false)?
            .set_default("email.queue_capacity", 100)?
            .set_default("email.max_attempts", 3)?
            .set_default("email.retry_backoff_ms", 500)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: OAUTH__GOOGLE__CLIENT_ID=... overrides oauth.google.client_id
            .add_source(Environment::default().separator("__"))
            .build()?;

        configuration.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Reject configurations that cannot run safely.
    ///
    /// # Errors
    /// Empty signing secret. In production also a short or committed signing
    /// secret, or missing OAuth client credentials.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.is_empty() {
            bail!("jwt.secret must be set");
        }
        if self.jwt.access_token_ttl_minutes <= 0 || self.jwt.refresh_token_ttl_days <= 0 {
            bail!("token lifetimes must be positive");
        }
        if self.is_production() {
            if self.jwt.secret == DEVELOPMENT_JWT_SECRET {
                bail!("jwt.secret must not be the development secret in production");
            }
            if self.jwt.secret.len() < MIN_PRODUCTION_SECRET_BYTES {
                bail!(
                    "jwt.secret must be at least {} bytes in production",
                    MIN_PRODUCTION_SECRET_BYTES
                );
            }
            let google = &self.oauth.google;
            if google.client_id.is_empty() || google.client_secret.is_empty() {
                bail!("oauth.google.client_id and client_secret must be set in production");
            }
        }
        if self.email.queue_capacity == 0 {
            bail!("email.queue_capacity must be at least 1");
        }
        Ok(())
    }
}
