use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;

use super::{expect_success, read_json, ServiceError};
use crate::config::Auth0Config;

const SERVICE: &str = "auth0";

/// Scope requested from the identity provider on login.
pub const LOGIN_SCOPE: &str = "openid name email picture";

/// A cached management token is replaced this long before it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Auth0 authentication + management API client.
#[derive(Debug, Clone)]
pub struct Auth0Service {
    http: Client,
    config: Auth0Config,
    base_url: String,
    management_token: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    /// `None` when the provider did not say; such tokens are kept until restart.
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn new(response: &TokenResponse, now: Instant) -> Self {
        Self {
            token: response.access_token.clone(),
            expires_at: response.expires_in.map(|secs| now + Duration::from_secs(secs)),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now + TOKEN_EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

/// Normalised user profile from `/userinfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auth0Profile {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl Auth0Service {
    pub fn new(http: Client, config: Auth0Config) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", config.domain))
            .trim_end_matches('/')
            .to_string();

        Self {
            http,
            config,
            base_url,
            management_token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn authorize_url(&self, state: &str) -> Result<String, ServiceError> {
        let mut url = Url::parse(&format!("{}/authorize", self.base_url))
            .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.callback_url)
            .append_pair("scope", LOGIN_SCOPE)
            .append_pair("state", state);
        Ok(url.into())
    }

    pub fn logout_url(&self, return_to: &str) -> Result<String, ServiceError> {
        let mut url = Url::parse(&format!("{}/v2/logout", self.base_url))
            .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("returnTo", return_to)
            .append_pair("client_id", &self.config.client_id);
        Ok(url.into())
    }

    /// Authorization-code exchange after the login redirect.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ServiceError> {
        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .json(&json!({
                "grant_type": "authorization_code",
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
                "redirect_uri": self.config.callback_url,
            }))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        read_json(SERVICE, response).await
    }

    pub async fn user_info(&self, access_token: &str) -> Result<Auth0Profile, ServiceError> {
        let response = self
            .http
            .get(format!("{}/userinfo", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        read_json(SERVICE, response).await
    }

    /// Client-credentials token for the management API; cached until shortly before it expires.
    pub async fn management_token(&self) -> Result<String, ServiceError> {
        if let Some(cached) = self.management_token.read().await.as_ref() {
            if cached.is_fresh(Instant::now()) {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.management_token.write().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(Instant::now()) {
                return Ok(cached.token.clone());
            }
            tracing::debug!("Auth0 management token expired, requesting a new one");
        }

        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "audience": format!("https://{}/api/v2/", self.config.domain),
                "scope": "read:users",
            }))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        let token: TokenResponse = match read_json(SERVICE, response).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Did not receive an Auth0 management token: {}", e);
                return Err(e);
            }
        };

        let preview: String = token.access_token.chars().take(10).collect();
        tracing::info!("Retrieved Auth0 management token: {} ...", preview);

        *slot = Some(CachedToken::new(&token, Instant::now()));
        Ok(token.access_token)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Value, ServiceError> {
        let token = self.management_token().await?;
        let mut url = Url::parse(&self.base_url).map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::decode(SERVICE, "auth0 base URL cannot be a base"))?
            .extend(["api", "v2", "users", user_id]);

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("user {}", user_id)));
        }
        read_json(SERVICE, response).await
    }

    /// Sends the password-reset mail for a database connection.
    pub async fn change_password(&self, email: &str, connection: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(format!("{}/dbconnections/change_password", self.base_url))
            .json(&json!({
                "client_id": self.config.client_id,
                "email": email,
                "connection": connection,
            }))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        expect_success(SERVICE, response).await?;
        Ok(())
    }
}
