//! Engine-facing error taxonomy.
//!
//! Mirrors the layering of `shared::types::errors`
//! (`DomainError` / `InfraError` / `AppError`) but collapses it to the single
//! enum the message engine reasons about: every per-message failure carries
//! enough information to decide `complete` vs `abandon` without the caller
//! needing to match on the underlying cause.

use thiserror::Error;

/// Failure surfaced by any stage of the engine's per-message pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("schema validation failed on field `{field}`: {reason}")]
    SchemaValidation { field: String, reason: String },

    #[error("confirmation {uuid} has no matching pending request")]
    UnmatchedConfirmation { uuid: String },

    #[error("action `{action}` is not supported in {mode} mode")]
    UnsupportedAction { action: String, mode: String },

    #[error("transient failure: {0}")]
    Transient(#[from] TransientError),

    #[error("fatal error: {0}")]
    Fatal(String),
}

/// I/O failures that should cause the transport to abandon (redeliver) the
/// message rather than treat it as a permanent failure.
#[derive(Debug, Error)]
pub enum TransientError {
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unknown charge point: {serial_number}")]
    UnknownChargepoint { serial_number: String },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    /// Whether the transport should abandon (redeliver) rather than treat
    /// the message as permanently failed. Only `Transient` failures are
    /// retryable; everything else is a property of the message itself and
    /// will fail identically on redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }

    /// Whether the process itself should exit. Only raised at construction
    /// time (schema registry init, config load), never per-message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }
}
