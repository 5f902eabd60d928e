//! Domain types for the DAG trigger relay.
//!
//! Holds the trigger data model, the request normalizer, and the error
//! taxonomy shared by the Airflow client crate and the HTTP surface.

pub mod conf;
pub mod error;
pub mod normalizer;
pub mod trigger;
