use std::sync::Arc;

use dagrelay_airflow::DagTriggerRelay;
use dagrelay_core::normalizer::Normalizer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Everything is read-only after startup and cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// Applies process defaults to inbound triggers.
    pub normalizer: Arc<Normalizer>,
    /// Authenticated relay to the Composer web server.
    pub relay: Arc<DagTriggerRelay>,
}
