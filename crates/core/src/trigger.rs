//! Trigger data model: inbound request, resolved parameters, outbound
//! payload and the per-invocation result.

use serde::{Deserialize, Serialize};

use crate::conf::{ConfMap, ConfValue};
use crate::error::{non_empty_var, CoreError, EnvLookup};

/// Key under which the bucket is placed in the DAG run `conf`.
pub const CONF_KEY_BUCKET: &str = "bucket";
/// Key under which the file path is placed in the DAG run `conf`.
pub const CONF_KEY_FILE: &str = "file";

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

/// Trigger parameters as supplied by the caller. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TriggerRequest {
    pub bucket: Option<String>,
    pub file: Option<String>,
    pub dag_id: Option<String>,
    pub additional_config: Option<ConfMap>,
}

/// Query-string form of a trigger. Nested config is not expressible here.
#[derive(Debug, Clone, Default)]
pub struct TriggerQuery {
    pub bucket: Option<String>,
    pub file: Option<String>,
    pub dag_id: Option<String>,
}

impl TriggerQuery {
    /// Build from decoded query pairs. Repeated keys keep their first value
    /// and unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "bucket" => &mut query.bucket,
                "file" => &mut query.file,
                "dag_id" => &mut query.dag_id,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

impl From<TriggerQuery> for TriggerRequest {
    fn from(query: TriggerQuery) -> Self {
        Self {
            bucket: query.bucket,
            file: query.file,
            dag_id: query.dag_id,
            additional_config: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Process-wide fallbacks applied when a request omits a field.
#[derive(Debug, Clone, Default)]
pub struct TriggerDefaults {
    pub dag_id: Option<String>,
    pub bucket: Option<String>,
    pub file: Option<String>,
}

impl TriggerDefaults {
    /// Load defaults from environment variables.
    ///
    /// | Env Var          | Default |
    /// |------------------|---------|
    /// | `DEFAULT_DAG_ID` | none    |
    /// | `DEFAULT_BUCKET` | none    |
    /// | `DEFAULT_FILE`   | none    |
    pub fn from_env() -> Self {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: EnvLookup<'_>) -> Self {
        Self {
            dag_id: non_empty_var(lookup, "DEFAULT_DAG_ID"),
            bucket: non_empty_var(lookup, "DEFAULT_BUCKET"),
            file: non_empty_var(lookup, "DEFAULT_FILE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A trigger with defaults applied. `dag_id` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrigger {
    pub dag_id: String,
    pub bucket: Option<String>,
    pub file: Option<String>,
    pub additional_config: ConfMap,
}

impl TriggerRequest {
    /// Apply `defaults`, failing if no DAG id can be determined.
    pub fn resolve(self, defaults: &TriggerDefaults) -> Result<ResolvedTrigger, CoreError> {
        let dag_id = pick(self.dag_id, &defaults.dag_id).ok_or_else(|| {
            CoreError::BadRequest(
                "dag_id is required: none was supplied and DEFAULT_DAG_ID is not configured"
                    .to_string(),
            )
        })?;

        Ok(ResolvedTrigger {
            dag_id,
            bucket: pick(self.bucket, &defaults.bucket),
            file: pick(self.file, &defaults.file),
            additional_config: self.additional_config.unwrap_or_default(),
        })
    }
}

/// Explicit value when non-empty, otherwise the non-empty default.
fn pick(explicit: Option<String>, fallback: &Option<String>) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.clone().filter(|v| !v.is_empty()))
}

impl ResolvedTrigger {
    /// Build the DAG run `conf`: `additional_config` first, then `bucket`
    /// and `file` overriding any same-named keys.
    pub fn dag_conf(&self) -> ConfMap {
        let mut conf = self.additional_config.clone();
        if let Some(bucket) = &self.bucket {
            conf.insert(CONF_KEY_BUCKET.to_string(), ConfValue::from(bucket.as_str()));
        }
        if let Some(file) = &self.file {
            conf.insert(CONF_KEY_FILE.to_string(), ConfValue::from(file.as_str()));
        }
        conf
    }

    pub fn payload(&self) -> DagRunPayload {
        DagRunPayload {
            conf: self.dag_conf(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound payload and result
// ---------------------------------------------------------------------------

/// Body of the Airflow "trigger DAG run" request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagRunPayload {
    pub conf: ConfMap,
}

/// Details of a DAG run the orchestration service accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSuccess {
    pub dag_id: String,
    pub dag_conf: ConfMap,
    /// Remote response body, passed through untouched.
    pub response: String,
}

/// Outcome of one trigger invocation.
#[derive(Debug)]
pub enum TriggerResult {
    Success(TriggerSuccess),
    Failure(CoreError),
}
