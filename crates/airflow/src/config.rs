use std::time::Duration;

use dagrelay_core::error::{non_empty_var, ConfigError, EnvLookup};
use reqwest::Url;

/// Default metadata server host used to mint ambient tokens.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Default outbound timeout for the Airflow call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;

/// How the relay obtains the bearer token sent to the web server.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// OIDC identity token with the web-server origin as audience.
    IdToken,
    /// OAuth2 access token with the `cloud-platform` scope.
    AccessToken,
    /// Fixed token, for local development behind a proxy.
    Static(String),
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::IdToken => f.write_str("IdToken"),
            AuthMode::AccessToken => f.write_str("AccessToken"),
            AuthMode::Static(_) => f.write_str("Static(<redacted>)"),
        }
    }
}

/// Connection settings for the Composer web server.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Airflow web server URL, e.g. `https://abc-dot-europe-west1.composer.googleusercontent.com`.
    pub web_server_url: Url,
    pub auth_mode: AuthMode,
    /// Timeout for the single outbound trigger request.
    pub request_timeout: Duration,
    /// Base URL of the metadata server (`http://{GCE_METADATA_HOST}`).
    pub metadata_url: String,
}

impl ComposerConfig {
    /// Load Composer settings from environment variables.
    ///
    /// | Env Var                         | Default                    |
    /// |---------------------------------|----------------------------|
    /// | `COMPOSER_WEB_SERVER_URL`       | required                   |
    /// | `COMPOSER_AUTH_MODE`            | `id_token`                 |
    /// | `COMPOSER_IDENTITY_TOKEN`       | required for `static`      |
    /// | `COMPOSER_REQUEST_TIMEOUT_SECS` | `90`                       |
    /// | `GCE_METADATA_HOST`             | `metadata.google.internal` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let raw_url = non_empty_var(lookup, "COMPOSER_WEB_SERVER_URL")
            .ok_or(ConfigError::Missing("COMPOSER_WEB_SERVER_URL"))?;
        let web_server_url = parse_web_server_url(&raw_url)?;

        let auth_mode = match non_empty_var(lookup, "COMPOSER_AUTH_MODE").as_deref() {
            None | Some("id_token") => AuthMode::IdToken,
            Some("access_token") => AuthMode::AccessToken,
            Some("static") => AuthMode::Static(
                non_empty_var(lookup, "COMPOSER_IDENTITY_TOKEN")
                    .ok_or(ConfigError::Missing("COMPOSER_IDENTITY_TOKEN"))?,
            ),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "COMPOSER_AUTH_MODE",
                    reason: format!(
                        "unknown mode '{other}' (expected id_token, access_token or static)"
                    ),
                })
            }
        };

        let request_timeout_secs = match non_empty_var(lookup, "COMPOSER_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: "COMPOSER_REQUEST_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let metadata_host = non_empty_var(lookup, "GCE_METADATA_HOST")
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());

        Ok(Self {
            web_server_url,
            auth_mode,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metadata_url: format!("http://{metadata_host}"),
        })
    }

    /// Token audience: the web server's origin, without path or trailing slash.
    pub fn audience(&self) -> String {
        self.web_server_url.origin().ascii_serialization()
    }
}

/// Parse and check the web server URL. Only absolute http(s) URLs are usable.
pub fn parse_web_server_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key: "COMPOSER_WEB_SERVER_URL",
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(ConfigError::Invalid {
            key: "COMPOSER_WEB_SERVER_URL",
            reason: format!("'{raw}' is not an http(s) URL"),
        });
    }
    Ok(url)
}
