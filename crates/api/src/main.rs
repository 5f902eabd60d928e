use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dagrelay_airflow::{identity, DagTriggerRelay};
use dagrelay_api::config::ServerConfig;
use dagrelay_api::router::build_app_router;
use dagrelay_api::shutdown::shutdown_signal;
use dagrelay_api::state::AppState;
use dagrelay_core::normalizer::Normalizer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "dagrelay_api=debug,dagrelay_airflow=debug,tower_http=info".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        web_server = %config.composer.web_server_url,
        auth_mode = ?config.composer.auth_mode,
        default_dag_id = ?config.defaults.dag_id,
        "Loaded server configuration"
    );

    // --- Relay ---
    let identity =
        identity::provider_for(&config.composer).expect("Failed to build identity provider");
    let relay = DagTriggerRelay::new(&config.composer, identity)
        .expect("Failed to build Airflow HTTP client");
    tracing::info!(audience = %relay.audience(), "Relay ready");

    // --- App state ---
    let state = AppState {
        normalizer: Arc::new(Normalizer::new(config.defaults.clone())),
        relay: Arc::new(relay),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}
