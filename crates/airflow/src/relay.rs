//! Authenticated relay: one trigger attempt from resolved parameters to a
//! [`TriggerResult`].
//!
//! Steps, in order: acquire a token for the web server audience, build the
//! DAG run payload, issue a single POST, and classify the outcome. Every
//! failure is returned as [`TriggerResult::Failure`]; nothing escapes as an
//! error value.

use std::sync::Arc;

use dagrelay_core::error::CoreError;
use dagrelay_core::trigger::{ResolvedTrigger, TriggerResult, TriggerSuccess};

use crate::client::{AirflowApiError, AirflowClient};
use crate::config::ComposerConfig;
use crate::identity::IdentityProvider;

/// Message used when Airflow refuses the caller's identity.
pub const PERMISSION_DENIED_HINT: &str = "You do not have permission to perform this operation. \
     Check Airflow RBAC roles for your account.";

/// Triggers DAG runs on a single Composer environment.
pub struct DagTriggerRelay {
    client: AirflowClient,
    identity: Arc<dyn IdentityProvider>,
    audience: String,
}

impl DagTriggerRelay {
    /// Build a relay from the startup configuration.
    pub fn new(
        config: &ComposerConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AirflowApiError> {
        let client = AirflowClient::new(config.web_server_url.clone(), config.request_timeout)?;
        Ok(Self {
            client,
            identity,
            audience: config.audience(),
        })
    }

    /// Audience requested for every token.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Make one attempt to trigger `trigger.dag_id`.
    pub async fn trigger(&self, trigger: &ResolvedTrigger) -> TriggerResult {
        let dag_id = trigger.dag_id.as_str();
        let payload = trigger.payload();

        let token = match self.identity.fetch_token(&self.audience).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(dag_id, audience = %self.audience, error = %e, "Failed to obtain identity token");
                return TriggerResult::Failure(CoreError::AuthFailure(format!(
                    "Could not obtain an identity token for {}: {e}",
                    self.audience
                )));
            }
        };

        tracing::info!(dag_id, "Triggering DAG run");

        match self.client.trigger_dag_run(dag_id, &payload, &token).await {
            Ok(response) => {
                tracing::info!(dag_id, "DAG run triggered");
                TriggerResult::Success(TriggerSuccess {
                    dag_id: dag_id.to_string(),
                    dag_conf: payload.conf,
                    response,
                })
            }
            Err(e) => {
                let err = classify_api_error(dag_id, e);
                tracing::warn!(dag_id, error = %err, "DAG run trigger failed");
                TriggerResult::Failure(err)
            }
        }
    }
}

/// Map an Airflow client error onto the relay's failure taxonomy.
///
/// - 401 / 403 -> `AuthFailure`
/// - any other non-2xx -> `Upstream`, embedding status and body
/// - transport errors -> `Upstream`, timeouts called out explicitly
/// - unusable URL -> `Internal`
pub fn classify_api_error(dag_id: &str, err: AirflowApiError) -> CoreError {
    match err {
        AirflowApiError::ApiError { status, body } if status == 401 || status == 403 => {
            CoreError::AuthFailure(format!("{PERMISSION_DENIED_HINT} (HTTP {status}: {body})"))
        }
        AirflowApiError::ApiError { status, body } if (400..500).contains(&status) => {
            CoreError::Upstream(format!(
                "Airflow rejected the run for DAG '{dag_id}' (HTTP {status}): {body}"
            ))
        }
        AirflowApiError::ApiError { status, body } => CoreError::Upstream(format!(
            "Airflow web server error for DAG '{dag_id}' (HTTP {status}): {body}"
        )),
        AirflowApiError::Request(e) if e.is_timeout() => CoreError::Upstream(format!(
            "Timed out waiting for the Airflow web server: {e}"
        )),
        AirflowApiError::Request(e) => CoreError::Upstream(format!(
            "Could not reach the Airflow web server: {e}"
        )),
        AirflowApiError::InvalidUrl(msg) => CoreError::Internal(msg),
    }
}
