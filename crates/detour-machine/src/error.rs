//! Error types for the detour machine
//!
//! The machine itself never fails: guard-blocked and unrecognized events are
//! simply not handled. Errors only surface at the edges:
//! - Route pattern lookups (collaborator port)
//! - Snapshot validation before restore
//! - Configuration and file loading in the replay binary

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum DetourError {
    /// Route pattern lookup failed
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// Persisted snapshot could not be restored
    #[error("snapshot rejected: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while reading inputs
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DetourError {
    /// Check if the error came from the route pattern lookup service
    #[inline]
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }
}

/// Route pattern lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Lookup attempted without a route id
    #[error("No Route ID")]
    NoRouteId,

    /// The lookup service reported a failure
    #[error("service error: {0}")]
    Service(String),

    /// The lookup did not resolve in time
    #[error("lookup timed out after {after_ms}ms")]
    TimedOut {
        /// Configured timeout
        after_ms: u64,
    },
}

impl LookupError {
    /// Check if retrying the same lookup could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service(_) | Self::TimedOut { .. })
    }
}

/// Snapshot validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// The persisted value is not a JSON object
    #[error("snapshot is not an object")]
    NotAnObject,

    /// The value is an object the machine cannot load
    #[error("rejected by the machine on load: {0}")]
    RejectedByMachine(String),
}
