//! Typed representation of DAG run configuration.
//!
//! `conf` values travel opaquely from the caller to Airflow, so any JSON
//! value is accepted. Keys keep their insertion order so the payload sent
//! downstream reads the same as the one the caller supplied.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered string-keyed mapping used for `conf` and `additional_config`.
pub type ConfMap = IndexMap<String, ConfValue>;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ConfValue>),
    Map(ConfMap),
}

impl ConfValue {
    /// Borrow the inner string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ConfValue {
    fn from(value: &str) -> Self {
        ConfValue::String(value.to_string())
    }
}
