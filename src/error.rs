//! Central error types for the cloudtrim pipeline.
//!
//! Each infrastructure module (store, provider, bedrock) defines its own
//! `thiserror` enum; this module collects them behind one crate-level error
//! so handlers translate a single type to exit codes / status codes.

use thiserror::Error;

use crate::pipeline::store::StorageError;
use crate::provider::ProviderError;

/// Top-level error for pipeline operations.
#[derive(Debug, Error)]
pub enum CloudTrimError {
    /// Resource, recommendation, or alert does not exist. Surfaced to the
    /// caller, never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// Structurally invalid request (malformed id, bad field value).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource kind outside the supported set (compute, object-store, table).
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    /// Persistence failure. Callers must not assume partial writes succeeded.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Provider call failed after local retry handling.
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration could not be loaded or serialized.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, CloudTrimError>;
