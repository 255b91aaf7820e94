//! Credential providers.
//!
//! An API key is static. OAuth access tokens are read from an authorized-user
//! token file, refreshed through a [`TokenRefresher`] when they are about to
//! expire, and written back so the next run starts with a fresh token.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::core::{AccessToken, Credential, CredentialProvider, ServiceError, ServiceFuture};
use tokio::sync::Mutex;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// StaticCredential
// ---------------------------------------------------------------------------

pub struct StaticCredential {
    credential: Credential,
}

impl StaticCredential {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl CredentialProvider for StaticCredential {
    fn credential(&self) -> ServiceFuture<'_, Credential> {
        Box::pin(async move { Ok(self.credential.clone()) })
    }
}

// ---------------------------------------------------------------------------
// TokenFile: authorized-user token cache on disk
// ---------------------------------------------------------------------------

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_owned()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenFile {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields such as `scopes` are carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenFile {
    pub fn read(path: &Path) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Credential(format!("cannot read token file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ServiceError::Credential(format!("invalid token file {}: {e}", path.display()))
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), ServiceError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ServiceError::Credential(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| {
            ServiceError::Credential(format!("cannot write token file {}: {e}", path.display()))
        })
    }

    /// A token without an expiry never goes stale.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - now > chrono::Duration::seconds(EXPIRY_MARGIN_SECS),
            None => !self.token.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenRefresher: injectable refresh strategy
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct RefreshedToken {
    pub access_token: AccessToken,
    pub expires_in: Option<i64>,
}

pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, token: &'a TokenFile) -> ServiceFuture<'a, RefreshedToken>;
}

/// `refresh_token` grant against the token file's `token_uri`.
pub struct OAuthRefresher {
    client: reqwest::Client,
}

impl OAuthRefresher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[derive(Deserialize)]
struct TokenResponseWire {
    access_token: String,
    expires_in: Option<i64>,
}

impl TokenRefresher for OAuthRefresher {
    fn refresh<'a>(&'a self, token: &'a TokenFile) -> ServiceFuture<'a, RefreshedToken> {
        Box::pin(async move {
            let Some(refresh_token) = token.refresh_token.as_deref() else {
                return Err(ServiceError::Credential(
                    "token file has no refresh_token".to_owned(),
                ));
            };
            let form = [
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", token.client_id.as_str()),
                ("client_secret", token.client_secret.as_str()),
            ];

            let resp = self
                .client
                .post(&token.token_uri)
                .form(&form)
                .send()
                .await
                .map_err(|e| ServiceError::Connection(e.to_string()))?;

            let status = resp.status();
            let body = resp
                .bytes()
                .await
                .map_err(|e| ServiceError::Connection(e.to_string()))?;
            if !status.is_success() {
                return Err(ServiceError::Credential(format!(
                    "token refresh returned HTTP {}: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body)
                )));
            }

            let wire: TokenResponseWire = serde_json::from_slice(&body)
                .map_err(|e| ServiceError::Decode(e.to_string()))?;
            Ok(RefreshedToken {
                access_token: AccessToken::new(wire.access_token),
                expires_in: wire.expires_in,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// CachedTokenProvider
// ---------------------------------------------------------------------------

pub struct CachedTokenProvider<R> {
    path: PathBuf,
    refresher: R,
    cached: Mutex<Option<TokenFile>>,
}

impl<R: TokenRefresher> CachedTokenProvider<R> {
    pub fn new(path: PathBuf, refresher: R) -> Self {
        Self {
            path,
            refresher,
            cached: Mutex::new(None),
        }
    }

    async fn current(&self) -> Result<Credential, ServiceError> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = Some(TokenFile::read(&self.path)?);
        }
        let Some(token) = cached.as_mut() else {
            return Err(ServiceError::Credential("token cache is empty".to_owned()));
        };

        if token.is_fresh(Utc::now()) {
            return Ok(Credential::Bearer(AccessToken::new(token.token.clone())));
        }

        if token.refresh_token.is_none() {
            return Err(ServiceError::Credential(format!(
                "access token in {} expired and no refresh_token is available",
                self.path.display()
            )));
        }

        tracing::info!(path = %self.path.display(), "refreshing OAuth access token");
        let refreshed = self.refresher.refresh(token).await?;
        token.token = refreshed.access_token.as_str().to_owned();
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        token.write(&self.path)?;

        Ok(Credential::Bearer(refreshed.access_token))
    }
}

impl<R: TokenRefresher> CredentialProvider for CachedTokenProvider<R> {
    fn credential(&self) -> ServiceFuture<'_, Credential> {
        Box::pin(self.current())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
