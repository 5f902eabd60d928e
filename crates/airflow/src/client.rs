//! REST client for the Airflow 2 stable API served by a Composer web server.
//!
//! Only the "trigger DAG run" endpoint is wrapped. Each call is a single
//! attempt: triggering is not idempotent, so nothing here retries.

use std::time::Duration;

use dagrelay_core::trigger::DagRunPayload;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;

/// Placeholder for a response body that could not be read.
const UNREADABLE_BODY: &str = "<unreadable body>";

/// HTTP client for one Airflow web server.
pub struct AirflowClient {
    client: reqwest::Client,
    web_server_url: Url,
}

/// Errors from the Airflow REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum AirflowApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Airflow returned a non-2xx status code.
    #[error("Airflow API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The endpoint URL could not be built from the web server URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl AirflowClient {
    /// Create a client with its own connection pool and request timeout.
    pub fn new(web_server_url: Url, timeout: Duration) -> Result<Self, AirflowApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, web_server_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, web_server_url: Url) -> Self {
        Self {
            client,
            web_server_url,
        }
    }

    /// `{web_server_url}/api/v1/dags/{dag_id}/dagRuns`, with `dag_id`
    /// percent-encoded as a single path segment.
    pub fn dag_runs_url(&self, dag_id: &str) -> Result<Url, AirflowApiError> {
        let mut url = self.web_server_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| {
                AirflowApiError::InvalidUrl(format!(
                    "{} cannot be used as a base URL",
                    self.web_server_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "dags", dag_id, "dagRuns"]);
        Ok(url)
    }

    /// Trigger a new run of `dag_id`.
    ///
    /// Sends `POST /api/v1/dags/{dag_id}/dagRuns` with the bearer `token`
    /// and `payload` as the JSON body. Returns the response body verbatim
    /// on any 2xx status. Once a 2xx status has arrived the run exists, so a
    /// body that fails to download is reported as a placeholder instead of
    /// an error.
    pub async fn trigger_dag_run(
        &self,
        dag_id: &str,
        payload: &DagRunPayload,
        token: &str,
    ) -> Result<String, AirflowApiError> {
        let url = self.dag_runs_url(dag_id)?;

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(payload)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let status = response.status();
        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) => {
                tracing::warn!(
                    dag_id,
                    status = status.as_u16(),
                    error = %e,
                    "DAG run accepted but the response body could not be read"
                );
                Ok(UNREADABLE_BODY.to_string())
            }
        }
    }

    /// Return the response unchanged on success, or an
    /// [`AirflowApiError::ApiError`] carrying status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AirflowApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
            return Err(AirflowApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use dagrelay_core::conf::ConfMap;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(base: &str) -> AirflowClient {
        AirflowClient::new(base.parse().unwrap(), Duration::from_secs(5)).unwrap()
    }

    fn payload() -> DagRunPayload {
        DagRunPayload {
            conf: serde_json::from_value(json!({ "bucket": "b", "file": "f" })).unwrap(),
        }
    }

    #[test]
    fn dag_runs_url_appends_api_path() {
        let url = client("https://airflow.example.com").dag_runs_url("etl").unwrap();
        assert_eq!(url.as_str(), "https://airflow.example.com/api/v1/dags/etl/dagRuns");

        let trailing = client("https://airflow.example.com/").dag_runs_url("etl").unwrap();
        assert_eq!(trailing.as_str(), "https://airflow.example.com/api/v1/dags/etl/dagRuns");
    }

    #[test]
    fn dag_runs_url_keeps_base_path_and_encodes_dag_id() {
        let url = client("https://proxy.example.com/airflow/?x=1")
            .dag_runs_url("team/etl daily")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/airflow/api/v1/dags/team%2Fetl%20daily/dagRuns"
        );
    }

    #[tokio::test]
    async fn trigger_posts_payload_with_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/dags/etl/dagRuns")
            .match_header("authorization", "Bearer tok-123")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "conf": { "bucket": "b", "file": "f" } })))
            .with_status(200)
            .with_body(r#"{"dag_run_id":"manual__2024","state":"queued"}"#)
            .create_async()
            .await;

        let body = client(&server.url())
            .trigger_dag_run("etl", &payload(), "tok-123")
            .await
            .unwrap();

        assert_eq!(body, r#"{"dag_run_id":"manual__2024","state":"queued"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_conf_is_sent_as_object() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/dags/etl/dagRuns")
            .match_body(Matcher::Json(json!({ "conf": {} })))
            .with_status(200)
            .create_async()
            .await;

        let empty = DagRunPayload {
            conf: ConfMap::new(),
        };
        client(&server.url())
            .trigger_dag_run("etl", &empty, "t")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/dags/missing/dagRuns")
            .with_status(404)
            .with_body(r#"{"title":"DAG not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .trigger_dag_run("missing", &payload(), "t")
            .await
            .unwrap_err();

        assert_matches!(
            err,
            AirflowApiError::ApiError { status: 404, ref body } if body.contains("DAG not found")
        );
    }

    #[tokio::test]
    async fn connection_failure_is_request_error() {
        let err = client("http://127.0.0.1:1")
            .trigger_dag_run("etl", &payload(), "t")
            .await
            .unwrap_err();
        assert_matches!(err, AirflowApiError::Request(_));
        assert!(err.to_string().starts_with("HTTP request failed"));
    }

    #[tokio::test]
    async fn truncated_success_body_still_counts_as_triggered() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Drain the request (the JSON payload ends with "}}") before
            // answering with a body shorter than its declared length.
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"}}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"dag_run_id\"")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let body = client(&format!("http://{addr}"))
            .trigger_dag_run("etl", &payload(), "t")
            .await
            .unwrap();
        assert_eq!(body, UNREADABLE_BODY);
    }
}
