//! Google OAuth access tokens
//!
//! Service-account flow: sign a short-lived RS256 assertion with the key from
//! the credentials file, exchange it at the token endpoint, and cache the
//! resulting access token until shortly before it expires.

use crate::config::GoogleConfig;
use crate::error::AuthError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Scopes needed for the queue sheet and the evidence folder
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Fields of a service-account JSON key that the flow needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account identity
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// Token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read a key file downloaded from the cloud console
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let key_error = |reason: String| AuthError::KeyFile {
            path: path.display().to_string(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| key_error(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| key_error(e.to_string()))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct CachedToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

enum Source {
    ServiceAccount(ServiceAccountKey),
    Static(String),
}

/// Hands out bearer tokens for Sheets and Drive requests
pub struct TokenProvider {
    http: reqwest::Client,
    source: Source,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Token provider for a service account
    pub fn service_account(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            source: Source::ServiceAccount(key),
            cache: Mutex::new(None),
        }
    }

    /// Token provider that always returns `token`
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            source: Source::Static(token.into()),
            cache: Mutex::new(None),
        }
    }

    /// Pick the source from configuration: static token first, key file second
    pub fn from_config(http: reqwest::Client, config: &GoogleConfig) -> Result<Self, AuthError> {
        if let Some(token) = &config.access_token {
            info!("Using pre-issued Google access token");
            return Ok(Self::fixed(token.clone()));
        }
        let key = ServiceAccountKey::from_file(&config.service_account_file)?;
        info!(client_email = %key.client_email, "Using Google service account");
        Ok(Self::service_account(http, key))
    }

    /// A valid access token, refreshed if the cached one is near expiry
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let key = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::ServiceAccount(key) => key,
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Utc::now() < cached.refresh_at {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.exchange(key).await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            iss: &key.client_email,
            scope: SCOPES.join(" "),
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(format!("invalid token response: {}", e)))?;

        debug!(expires_in = token.expires_in, "Obtained Google access token");
        Ok(CachedToken {
            token: token.access_token,
            refresh_at: now + ChronoDuration::seconds(token.expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}
