/// Failure kinds a single trigger invocation can end in.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The inbound trigger could not be turned into a usable request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No ambient credential could be obtained, or the orchestration
    /// service refused the caller's identity.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// The orchestration service rejected the call or could not be reached.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading process configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Environment lookup used by the `from_lookup` config constructors.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read an optional variable, treating blank values as unset.
pub fn non_empty_var(lookup: EnvLookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
