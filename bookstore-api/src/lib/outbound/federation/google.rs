use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::GoogleOAuthConfig;
use crate::domain::auth::errors::FederationError;
use crate::domain::auth::models::ExternalIdentity;
use crate::domain::auth::ports::IdentityProvider;

const SCOPES: &str = "openid email profile";

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Subset of the OpenID Connect userinfo document.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    name: String,
    picture: Option<String>,
}

/// Google OAuth2 authorization-code client.
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_url: Url,
    token_url: String,
    userinfo_url: String,
    timeout: Duration,
}

impl GoogleIdentityProvider {
    /// Build the client from configuration.
    ///
    /// # Errors
    /// * `InvalidResponse` - `auth_url` is not a valid URL
    /// * `Transport` - HTTP client could not be built
    pub fn new(config: &GoogleOAuthConfig) -> Result<Self, FederationError> {
        let auth_url = Url::parse(&config.auth_url)
            .map_err(|e| FederationError::InvalidResponse(format!("auth_url: {e}")))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FederationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            auth_url,
            token_url: config.token_url.clone(),
            userinfo_url: config.userinfo_url.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    async fn exchange(&self, code: &str) -> Result<ExternalIdentity, FederationError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;
        let grant: TokenResponse = read_json(response).await?;

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(&grant.access_token)
            .send()
            .await
            .map_err(transport_error)?;
        let info: UserInfo = read_json(response).await?;

        if info.email.is_empty() {
            return Err(FederationError::InvalidResponse(
                "userinfo has no email".to_string(),
            ));
        }

        Ok(ExternalIdentity {
            subject_id: info.sub,
            email: info.email,
            name: info.name,
            picture: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

fn transport_error(e: reqwest::Error) -> FederationError {
    if e.is_timeout() {
        FederationError::Timeout
    } else {
        FederationError::Transport(e.to_string())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FederationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FederationError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FederationError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, FederationError> {
        match tokio::time::timeout(self.timeout, self.exchange(code)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Google code exchange timed out"
                );
                Err(FederationError::Timeout)
            }
        }
    }
}
