//! Cloud Composer (Airflow 2) integration.
//!
//! Provides the Composer connection config, ambient identity token
//! providers, a REST client for the stable Airflow API, and the
//! [`relay::DagTriggerRelay`] that ties them together into a single
//! authenticated trigger attempt.

pub mod client;
pub mod config;
pub mod identity;
pub mod relay;

pub use client::AirflowClient;
pub use config::{AuthMode, ComposerConfig};
pub use identity::{IdentityError, IdentityProvider};
pub use relay::DagTriggerRelay;
