//! The correlator's abstract contract (SPEC_FULL.md §4.3), narrowed from the
//! Go source's `CacheAdapter` interface (`original_source/service/ocpp/store.go`)
//! to the five operations the engine actually calls.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::ocpp::ActionKind;

/// Per-message envelope metadata the transport hands to the engine.
#[derive(Debug, Clone)]
pub struct Meta {
    pub broker_id: String,
    pub serial_number: String,
}

/// A request stored while awaiting its confirmation (relay mode) or kept as
/// a correlation record (proxy mode records nothing — see SPEC_FULL.md §4.5).
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub unique_id: String,
    pub action: ActionKind,
    pub payload: Value,
    pub serial_number: String,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("no pending request for uuid `{0}`")]
    NotFound(String),
}

/// At-most-once bookkeeping plus pending-request correlation, backed by any
/// TTL-capable key-value store (SPEC_FULL.md §4.3).
#[async_trait]
pub trait Correlator: Send + Sync {
    async fn has_processed(&self, broker_id: &str) -> Result<bool, CacheError>;

    async fn mark_processed(&self, broker_id: &str) -> Result<(), CacheError>;

    async fn get_request(&self, unique_id: &str) -> Result<PendingRequest, CacheError>;

    /// Stores `req` under `req.unique_id` and atomically marks `meta.broker_id`
    /// processed.
    async fn put_request(&self, meta: &Meta, req: PendingRequest) -> Result<(), CacheError>;

    /// Removes the pending entry for `unique_id` and atomically marks
    /// `meta.broker_id` processed. Fails with `NotFound` if absent.
    async fn remove_request(&self, meta: &Meta, unique_id: &str) -> Result<(), CacheError>;
}
