pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers::trigger;
use crate::state::AppState;

/// Build the trigger route tree.
///
/// ```text
/// GET  /     trigger from query parameters
/// POST /     trigger from a JSON body
/// ```
pub fn trigger_routes() -> Router<AppState> {
    Router::new().route("/", get(trigger::trigger_dag).post(trigger::trigger_dag))
}
