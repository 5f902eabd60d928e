//! Response envelopes for the trigger endpoint.
//!
//! Every response carries a `status` of `"success"` or `"error"` so callers
//! can branch on the body alone.

use dagrelay_core::conf::ConfMap;
use dagrelay_core::trigger::TriggerSuccess;
use serde::Serialize;

pub const SUCCESS_MESSAGE: &str = "DAG triggered successfully";

/// `200` body returned when Airflow accepted the DAG run.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub dag_id: String,
    pub dag_conf: ConfMap,
    /// Airflow's response body, verbatim.
    pub response: String,
}

impl From<TriggerSuccess> for TriggerResponse {
    fn from(success: TriggerSuccess) -> Self {
        Self {
            status: "success",
            message: SUCCESS_MESSAGE,
            dag_id: success.dag_id,
            dag_conf: success.dag_conf,
            response: success.response,
        }
    }
}

/// Body of every non-200 response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error",
            message,
        }
    }
}
