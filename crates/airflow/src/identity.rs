//! Ambient credential providers.
//!
//! The relay authenticates as its own runtime identity. On Google Cloud that
//! identity is exposed by the metadata server, which mints either an OIDC
//! identity token for a given audience or an OAuth2 access token.
//! [`StaticTokenProvider`] covers local development where no metadata
//! server exists.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{AuthMode, ComposerConfig};

/// Scope requested for OAuth2 access tokens.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";
const ACCESS_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Metadata requests are local and should answer quickly.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The metadata server could not be reached (no ambient credential).
    #[error("metadata server unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The metadata server refused to mint a token.
    #[error("metadata server returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("metadata server returned an empty token")]
    Empty,

    #[error("unexpected token response: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of bearer tokens for the orchestration web server.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch a token scoped to `audience` (the web server origin).
    async fn fetch_token(&self, audience: &str) -> Result<String, IdentityError>;
}

/// Build the provider matching the configured [`AuthMode`].
pub fn provider_for(config: &ComposerConfig) -> Result<Arc<dyn IdentityProvider>, IdentityError> {
    let provider: Arc<dyn IdentityProvider> = match &config.auth_mode {
        AuthMode::IdToken => Arc::new(MetadataTokenProvider::new(
            config.metadata_url.clone(),
            TokenKind::IdToken,
        )?),
        AuthMode::AccessToken => Arc::new(MetadataTokenProvider::new(
            config.metadata_url.clone(),
            TokenKind::AccessToken,
        )?),
        AuthMode::Static(token) => Arc::new(StaticTokenProvider::new(token.clone())),
    };
    Ok(provider)
}

// ---------------------------------------------------------------------------
// Metadata server
// ---------------------------------------------------------------------------

/// Which kind of token the metadata server should mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    IdToken,
    AccessToken,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Fetches tokens for the instance's default service account.
pub struct MetadataTokenProvider {
    client: reqwest::Client,
    base_url: String,
    kind: TokenKind,
}

impl MetadataTokenProvider {
    /// * `base_url` - metadata server base, e.g. `http://metadata.google.internal`.
    pub fn new(base_url: String, kind: TokenKind) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            kind,
        })
    }

    async fn fetch_identity_token(&self, audience: &str) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(format!("{}{IDENTITY_PATH}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .query(&[("audience", audience), ("format", "full")])
            .send()
            .await?;

        let body = Self::ensure_success(response).await?.text().await?;
        non_empty(body.trim().to_string())
    }

    async fn fetch_access_token(&self) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(format!("{}{ACCESS_TOKEN_PATH}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", CLOUD_PLATFORM_SCOPE)])
            .send()
            .await?;

        let body = Self::ensure_success(response).await?.text().await?;
        let parsed: AccessTokenResponse =
            serde_json::from_str(&body).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        non_empty(parsed.access_token)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn non_empty(token: String) -> Result<String, IdentityError> {
    if token.is_empty() {
        Err(IdentityError::Empty)
    } else {
        Ok(token)
    }
}

#[async_trait]
impl IdentityProvider for MetadataTokenProvider {
    async fn fetch_token(&self, audience: &str) -> Result<String, IdentityError> {
        match self.kind {
            TokenKind::IdToken => self.fetch_identity_token(audience).await,
            TokenKind::AccessToken => self.fetch_access_token().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Static token
// ---------------------------------------------------------------------------

/// Hands out a fixed token regardless of audience.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn fetch_token(&self, _audience: &str) -> Result<String, IdentityError> {
        non_empty(self.token.clone())
    }
}
