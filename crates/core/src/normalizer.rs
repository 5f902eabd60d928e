//! Request normalizer.
//!
//! Turns the raw inbound trigger (a JSON body or query parameters) into a
//! [`ResolvedTrigger`] with process defaults applied. The parser is
//! permissive: unknown fields are ignored and `additional_config` accepts
//! any JSON value. It only rejects bodies that are not valid JSON or do not
//! have the expected shape.

use crate::error::CoreError;
use crate::trigger::{ResolvedTrigger, TriggerDefaults, TriggerQuery, TriggerRequest};

/// Normalizes inbound triggers against a fixed set of defaults.
#[derive(Debug, Clone)]
pub struct Normalizer {
    defaults: TriggerDefaults,
}

impl Normalizer {
    pub fn new(defaults: TriggerDefaults) -> Self {
        Self { defaults }
    }

    /// Produce a resolved trigger from a raw body and query parameters.
    ///
    /// A non-empty body takes precedence; the query string is only used
    /// when the body is empty or JSON `null`. A query that failed to parse
    /// is therefore only an error when it is actually consulted. The body
    /// is fully parsed before any default is applied.
    pub fn normalize(
        &self,
        body: &[u8],
        query: Result<TriggerQuery, CoreError>,
    ) -> Result<ResolvedTrigger, CoreError> {
        let request = match parse_body(body)? {
            Some(request) => request,
            None => TriggerRequest::from(query?),
        };
        request.resolve(&self.defaults)
    }
}

/// Parse a JSON trigger body. Blank bodies and `null` yield `None`.
pub fn parse_body(body: &[u8]) -> Result<Option<TriggerRequest>, CoreError> {
    let malformed = |reason: String| CoreError::BadRequest(format!("Malformed JSON body: {reason}"));

    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Ok(None),
        // Structs also deserialize from JSON arrays, so only objects go
        // through the typed path.
        Some(b'{') => serde_json::from_slice::<TriggerRequest>(body)
            .map(Some)
            .map_err(|e| malformed(e.to_string())),
        Some(_) => match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Null) => Ok(None),
            Ok(_) => Err(malformed("expected a JSON object".to_string())),
            Err(e) => Err(malformed(e.to_string())),
        },
    }
}
