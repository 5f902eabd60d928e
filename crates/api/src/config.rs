use std::time::Duration;

use dagrelay_airflow::config::ComposerConfig;
use dagrelay_airflow::identity::METADATA_TIMEOUT;
use dagrelay_core::error::{non_empty_var, ConfigError, EnvLookup};
use dagrelay_core::trigger::TriggerDefaults;

/// Server configuration loaded once at startup from environment variables.
///
/// Bind settings have defaults suitable for Cloud Run / Cloud Functions;
/// the Composer web server URL has none and must be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Inbound request timeout in seconds (default: `120`). Must exceed the
    /// Composer timeout plus the metadata-server timeout.
    pub request_timeout_secs: u64,
    /// Fallback trigger parameters.
    pub defaults: TriggerDefaults,
    /// Target Composer environment.
    pub composer: ComposerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `8080`    |
    /// | `REQUEST_TIMEOUT_SECS` | `120`     |
    ///
    /// See [`TriggerDefaults::from_env`] and [`ComposerConfig::from_env`]
    /// for the remaining variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let host = non_empty_var(lookup, "HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port: u16 = non_empty_var(lookup, "PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?;

        let request_timeout_secs: u64 = non_empty_var(lookup, "REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "120".into())
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                reason: e.to_string(),
            })?;

        let composer = ComposerConfig::from_lookup(lookup)?;

        // The outbound calls must give up before the inbound deadline so the
        // caller always sees the classified failure.
        let outbound_budget = composer.request_timeout + METADATA_TIMEOUT;
        if Duration::from_secs(request_timeout_secs) <= outbound_budget {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                reason: format!(
                    "must be greater than {}s (Composer request timeout plus metadata timeout)",
                    outbound_budget.as_secs()
                ),
            });
        }

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            defaults: TriggerDefaults::from_lookup(lookup),
            composer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_apply_when_unset() {
        let lookup = |key: &str| match key {
            "COMPOSER_WEB_SERVER_URL" => Some("https://airflow.example.com".to_string()),
            "DEFAULT_DAG_ID" => Some("gcs_to_bq".to_string()),
            _ => None,
        };
        let config = ServerConfig::from_lookup(&lookup).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.defaults.dag_id.as_deref(), Some("gcs_to_bq"));
        assert_eq!(config.composer.audience(), "https://airflow.example.com");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let lookup = |key: &str| match key {
            "COMPOSER_WEB_SERVER_URL" => Some("https://airflow.example.com".to_string()),
            "PORT" => Some("eighty".to_string()),
            _ => None,
        };
        assert_matches!(
            ServerConfig::from_lookup(&lookup),
            Err(ConfigError::Invalid { key: "PORT", .. })
        );
    }

    #[test]
    fn composer_url_is_required() {
        let lookup = |_: &str| -> Option<String> { None };
        assert_matches!(
            ServerConfig::from_lookup(&lookup),
            Err(ConfigError::Missing("COMPOSER_WEB_SERVER_URL"))
        );
    }

    #[test]
    fn inbound_timeout_must_exceed_outbound_budget() {
        let lookup = |key: &str| match key {
            "COMPOSER_WEB_SERVER_URL" => Some("https://airflow.example.com".to_string()),
            "REQUEST_TIMEOUT_SECS" => Some("100".to_string()),
            _ => None,
        };
        assert_matches!(
            ServerConfig::from_lookup(&lookup),
            Err(ConfigError::Invalid { key: "REQUEST_TIMEOUT_SECS", reason }) if reason.contains("100s")
        );
    }

    #[test]
    fn shorter_composer_timeout_allows_shorter_inbound_timeout() {
        let lookup = |key: &str| match key {
            "COMPOSER_WEB_SERVER_URL" => Some("https://airflow.example.com".to_string()),
            "COMPOSER_REQUEST_TIMEOUT_SECS" => Some("15".to_string()),
            "REQUEST_TIMEOUT_SECS" => Some("30".to_string()),
            _ => None,
        };
        let config = ServerConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
    }
}
