//! Bearer tokens for the agent service.
//!
//! A fixed `PROJECT_API_TOKEN` is used as given. With Entra service principal
//! settings the token is fetched with the client-credentials grant, cached,
//! and re-acquired shortly before it expires or when the service rejects it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use super::GenerationError;

/// Re-acquire this long before the reported expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Source of the bearer token sent with every agent service request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, GenerationError>;

    /// Forget the cached token after the service answered 401.
    fn invalidate(&self) {}
}

/// A token supplied through configuration; it cannot be renewed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

/// Service principal settings for the client-credentials grant.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// e.g. `https://login.microsoftonline.com`
    pub authority_host: String,
    /// e.g. `https://ai.azure.com/.default`
    pub scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Entra ID token acquired with the client-credentials grant.
pub struct ClientCredentialsToken {
    http: Client,
    credentials: ClientCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsToken {
    pub fn new(credentials: ClientCredentials, http: Client) -> Self {
        Self {
            http,
            credentials,
            cached: Mutex::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.credentials.authority_host.trim_end_matches('/'),
            self.credentials.tenant_id
        )
    }

    fn cached(&self) -> Option<String> {
        self.cached
            .lock()
            .as_ref()
            .filter(|c| Instant::now() < c.refresh_at)
            .map(|c| c.value.clone())
    }

    async fn acquire(&self) -> Result<CachedToken, GenerationError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.credentials.scope.as_str()),
        ];
        let response = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| GenerationError::Unavailable(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Unauthorized(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Unavailable(format!("unreadable token response: {}", e)))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        log::info!("Acquired agent service token valid for {:?}", lifetime);

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsToken {
    async fn token(&self) -> Result<String, GenerationError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        let fresh = self.acquire().await?;
        let value = fresh.value.clone();
        *self.cached.lock() = Some(fresh);
        Ok(value)
    }

    fn invalidate(&self) {
        log::warn!("Dropping cached agent service token");
        *self.cached.lock() = None;
    }
}
