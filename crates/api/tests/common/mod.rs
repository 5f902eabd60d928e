#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use dagrelay_airflow::config::{AuthMode, ComposerConfig};
use dagrelay_airflow::identity::{IdentityError, IdentityProvider};
use dagrelay_airflow::DagTriggerRelay;
use dagrelay_api::config::ServerConfig;
use dagrelay_api::router::build_app_router;
use dagrelay_api::state::AppState;
use dagrelay_core::normalizer::Normalizer;
use dagrelay_core::trigger::TriggerDefaults;

pub const TEST_TOKEN: &str = "test-identity-token";

/// Identity provider stub that records how often it was asked for a token.
pub struct StubIdentity {
    pub calls: AtomicUsize,
    pub audiences: std::sync::Mutex<Vec<String>>,
    available: bool,
}

impl StubIdentity {
    pub fn available() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            audiences: std::sync::Mutex::new(Vec::new()),
            available: true,
        })
    }

    /// Simulates a runtime with no ambient credential.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            audiences: std::sync::Mutex::new(Vec::new()),
            available: false,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn fetch_token(&self, audience: &str) -> Result<String, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.audiences.lock().unwrap().push(audience.to_string());
        if self.available {
            Ok(TEST_TOKEN.to_string())
        } else {
            Err(IdentityError::Rejected {
                status: 404,
                body: "no service account attached".to_string(),
            })
        }
    }
}

/// Defaults used by most tests: a default DAG and bucket, no default file.
pub fn test_defaults() -> TriggerDefaults {
    TriggerDefaults {
        dag_id: Some("default_dag".to_string()),
        bucket: Some("default-bucket".to_string()),
        file: None,
    }
}

/// Build a test `ServerConfig` pointing at `web_server_url`.
pub fn test_config(web_server_url: &str, defaults: TriggerDefaults) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        defaults,
        composer: ComposerConfig {
            web_server_url: web_server_url.parse().unwrap(),
            auth_mode: AuthMode::IdToken,
            request_timeout: Duration::from_secs(5),
            metadata_url: "http://127.0.0.1:1".to_string(),
        },
    }
}

/// Build the full application router against a stub Airflow web server.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (request ID, tracing, timeout, panic recovery) as production.
pub fn build_test_app(
    web_server_url: &str,
    identity: Arc<dyn IdentityProvider>,
    defaults: TriggerDefaults,
) -> Router {
    build_app_from_config(test_config(web_server_url, defaults), identity)
}

/// Build the router from an explicit config, e.g. with a short inbound timeout.
pub fn build_app_from_config(config: ServerConfig, identity: Arc<dyn IdentityProvider>) -> Router {
    let relay = DagTriggerRelay::new(&config.composer, identity).unwrap();

    let state = AppState {
        normalizer: Arc::new(Normalizer::new(config.defaults.clone())),
        relay: Arc::new(relay),
    };

    build_app_router(state, &config)
}

/// Bind a TCP listener that accepts connections and never answers them.
/// Returns its base URL.
pub async fn silent_web_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a raw JSON body.
pub async fn post_json(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
