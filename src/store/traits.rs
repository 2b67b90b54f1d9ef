//! The durable store's abstract contract (SPEC_FULL.md §4.4), narrowed from
//! the `Storage` trait and the Go `StoreAdapter` interface
//! (`original_source/service/ocpp/store.go`) to the two operations the
//! engine calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// SPEC_FULL.md §3's Charge Point record. Identity is `serial_number`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePoint {
    pub serial_number: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub meter_serial_number: Option<String>,
    pub meter_type: Option<String>,
    pub last_boot: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Fields carried by a BootNotification request, sufficient to upsert a
/// [`ChargePoint`] row.
#[derive(Debug, Clone)]
pub struct BootNotificationInfo {
    pub serial_number: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub meter_serial_number: Option<String>,
    pub meter_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("unknown charge point: {0}")]
    UnknownChargepoint(String),
}

#[async_trait]
pub trait ChargePointStore: Send + Sync {
    /// Upserts the charge point row, setting `last_boot = now()`.
    async fn add_chargepoint(&self, info: BootNotificationInfo) -> Result<(), StoreError>;

    /// Sets `last_heartbeat` for `serial_number`. Fails if no row exists.
    async fn update_last_heartbeat(
        &self,
        serial_number: &str,
        current_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Read accessor used by tests and scenario assertions; not part of the
    /// SPEC_FULL.md operation set but harmless to expose.
    async fn find(&self, serial_number: &str) -> Result<Option<ChargePoint>, StoreError>;
}
