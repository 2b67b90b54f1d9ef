//! The OCPP message engine: the state machine described in SPEC_FULL.md §4.5,
//! grounded in `original_source/service/ocpp/machine.go`'s `OcppMachine` and
//! its `HandleMessage`/`handleRequest`/`handleConfirmation` dispatch. The
//! functional-option construction style there (and in
//! `original_source/internal/core/azure-service-bus-client.go`'s
//! `WithAzureServiceBusServiceName`) is replaced by a builder that returns a
//! `Result` rather than panicking on a missing collaborator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cache::{CacheError, Correlator, Meta, PendingRequest};
use crate::errors::{EngineError, TransientError};
use crate::ocpp::{schema, ActionKind, OcppFrame};
use crate::shutdown::ShutdownSignal;
use crate::store::{BootNotificationInfo, ChargePointStore, StoreError};

/// SPEC_FULL.md §5's "5s for cache/store" reference timeout, applied to every
/// cache/store suspension point unless the builder overrides it.
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Races a cache/store call against the per-call timeout and the engine's
/// shutdown signal. A cancellation mid-suspension surfaces as
/// `TransientError::Cancelled` so the caller abandons the message instead of
/// completing it (SPEC_FULL.md §5's cancellation contract).
async fn with_timeout<T>(
    duration: Duration,
    shutdown: &ShutdownSignal,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    if shutdown.is_triggered() {
        return Err(EngineError::Transient(TransientError::Cancelled));
    }
    tokio::select! {
        result = tokio::time::timeout(duration, fut) => match result {
            Ok(result) => result,
            Err(_) => Err(EngineError::Transient(TransientError::Timeout(duration))),
        },
        _ = shutdown.notified().wait() => Err(EngineError::Transient(TransientError::Cancelled)),
    }
}

/// Whether the engine should synthesize a confirmation locally or await one
/// from a downstream peer (SPEC_FULL.md §4.5 "Mode selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Proxy,
    Relay,
}

/// Selects the dispatch mode for an action. The reference implementation
/// (`AlwaysProxy`) answers `Proxy` for every action; a future router could
/// return `Relay` for actions that must be forwarded.
pub trait ModeSelector: Send + Sync {
    fn select(&self, action: ActionKind) -> Mode;
}

pub struct AlwaysProxy;

impl ModeSelector for AlwaysProxy {
    fn select(&self, _action: ActionKind) -> Mode {
        Mode::Proxy
    }
}

impl From<CacheError> for EngineError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Unavailable(msg) => {
                EngineError::Transient(TransientError::CacheUnavailable(msg))
            }
            CacheError::NotFound(uuid) => EngineError::UnmatchedConfirmation { uuid },
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => {
                EngineError::Transient(TransientError::StoreUnavailable(msg))
            }
            StoreError::ConstraintViolation(msg) => EngineError::MalformedFrame(msg),
            StoreError::UnknownChargepoint(serial_number) => {
                EngineError::Transient(TransientError::UnknownChargepoint { serial_number })
            }
        }
    }
}

/// Builds an [`OcppEngine`], validating its collaborators at construction
/// time rather than lazily failing on first use.
pub struct OcppEngineBuilder {
    cache: Option<Arc<dyn Correlator>>,
    store: Option<Arc<dyn ChargePointStore>>,
    mode_selector: Option<Arc<dyn ModeSelector>>,
    cache_timeout: Duration,
    store_timeout: Duration,
    shutdown: ShutdownSignal,
}

impl Default for OcppEngineBuilder {
    fn default() -> Self {
        Self {
            cache: None,
            store: None,
            mode_selector: None,
            cache_timeout: DEFAULT_IO_TIMEOUT,
            store_timeout: DEFAULT_IO_TIMEOUT,
            shutdown: ShutdownSignal::new(),
        }
    }
}

impl OcppEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: Arc<dyn Correlator>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ChargePointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_mode_selector(mut self, selector: Arc<dyn ModeSelector>) -> Self {
        self.mode_selector = Some(selector);
        self
    }

    /// Overrides the per-call cache timeout (default 5s, SPEC_FULL.md §5).
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Overrides the per-call store timeout (default 5s, SPEC_FULL.md §5).
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Shares the process's shutdown signal with the engine so every
    /// cache/store suspension point can be cancelled mid-flight rather than
    /// running to completion after shutdown has been triggered.
    pub fn with_shutdown_signal(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn build(self) -> Result<OcppEngine, EngineError> {
        let cache = self
            .cache
            .ok_or_else(|| EngineError::Fatal("engine built without a cache".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| EngineError::Fatal("engine built without a store".to_string()))?;
        schema::init();
        Ok(OcppEngine {
            cache,
            store,
            mode_selector: self.mode_selector.unwrap_or_else(|| Arc::new(AlwaysProxy)),
            cache_timeout: self.cache_timeout,
            store_timeout: self.store_timeout,
            shutdown: self.shutdown,
        })
    }
}

pub struct OcppEngine {
    cache: Arc<dyn Correlator>,
    store: Arc<dyn ChargePointStore>,
    mode_selector: Arc<dyn ModeSelector>,
    cache_timeout: Duration,
    store_timeout: Duration,
    shutdown: ShutdownSignal,
}

impl OcppEngine {
    pub fn builder() -> OcppEngineBuilder {
        OcppEngineBuilder::new()
    }

    /// Handles one inbound message end to end (SPEC_FULL.md §4.5's state
    /// machine). Returns `Ok(Some(bytes))` when a protocol reply must be
    /// emitted (proxy mode), `Ok(None)` otherwise (already-processed,
    /// relay-mode request, or confirmation).
    pub async fn handle(&self, meta: &Meta, bytes: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        if with_timeout(
            self.cache_timeout,
            &self.shutdown,
            async { Ok(self.cache.has_processed(&meta.broker_id).await?) },
        )
        .await?
        {
            debug!(broker_id = %meta.broker_id, "duplicate delivery, already processed");
            return Ok(None);
        }

        let text = std::str::from_utf8(bytes)
            .map_err(|e| EngineError::MalformedFrame(e.to_string()))?;
        let frame = OcppFrame::parse(text).map_err(|e| EngineError::MalformedFrame(e.to_string()))?;

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => self.handle_request(meta, unique_id, action, payload).await,
            OcppFrame::CallResult { unique_id, payload } => {
                self.handle_confirmation(meta, unique_id, payload).await
            }
            OcppFrame::CallError { .. } => Err(EngineError::MalformedFrame(
                "CallError is out of scope for dispatch".to_string(),
            )),
        }
    }

    async fn handle_request(
        &self,
        meta: &Meta,
        unique_id: String,
        action_str: String,
        payload: Value,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let action: ActionKind = action_str
            .parse()
            .map_err(|_| EngineError::MalformedFrame(format!("unknown action `{action_str}`")))?;

        schema::validate_request(action, &payload)?;

        let mode = self.mode_selector.select(action);
        match mode {
            Mode::Proxy => {
                let reply = self.dispatch_proxy(meta, &unique_id, action, &payload).await?;
                with_timeout(self.cache_timeout, &self.shutdown, async {
                    Ok(self.cache.mark_processed(&meta.broker_id).await?)
                })
                .await?;
                Ok(reply)
            }
            Mode::Relay => {
                let req = PendingRequest {
                    unique_id,
                    action,
                    payload,
                    serial_number: meta.serial_number.clone(),
                };
                with_timeout(self.cache_timeout, &self.shutdown, async {
                    Ok(self.cache.put_request(meta, req).await?)
                })
                .await?;
                Ok(None)
            }
        }
    }

    async fn dispatch_proxy(
        &self,
        meta: &Meta,
        unique_id: &str,
        action: ActionKind,
        payload: &Value,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        match action {
            ActionKind::Heartbeat => {
                let now = Utc::now();
                with_timeout(self.store_timeout, &self.shutdown, async {
                    Ok(self.store.update_last_heartbeat(&meta.serial_number, now).await?)
                })
                .await?;
                let confirmation = json!({ "currentTime": now.to_rfc3339() });
                info!(serial_number = %meta.serial_number, action = %action, "proxied heartbeat");
                Ok(Some(
                    OcppFrame::confirmation(unique_id, confirmation).serialize(),
                ))
            }
            ActionKind::BootNotification => {
                let info = boot_notification_info(&meta.serial_number, payload);
                with_timeout(self.store_timeout, &self.shutdown, async {
                    Ok(self.store.add_chargepoint(info).await?)
                })
                .await?;
                let confirmation = json!({
                    "status": "Accepted",
                    "interval": 30,
                    "currentTime": Utc::now().to_rfc3339(),
                });
                info!(serial_number = %meta.serial_number, action = %action, "proxied boot notification");
                Ok(Some(
                    OcppFrame::confirmation(unique_id, confirmation).serialize(),
                ))
            }
            other => {
                warn!(action = %other, "no proxy-mode handler defined");
                Err(EngineError::UnsupportedAction {
                    action: other.to_string(),
                    mode: "proxy".to_string(),
                })
            }
        }
    }

    async fn handle_confirmation(
        &self,
        meta: &Meta,
        unique_id: String,
        payload: Value,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let pending = with_timeout(self.cache_timeout, &self.shutdown, async {
            Ok(self.cache.get_request(&unique_id).await?)
        })
        .await?;
        schema::validate_confirmation(pending.action, &payload)?;

        match pending.action {
            ActionKind::BootNotification => {
                let info = boot_notification_info(&pending.serial_number, &pending.payload);
                with_timeout(self.store_timeout, &self.shutdown, async {
                    Ok(self.store.add_chargepoint(info).await?)
                })
                .await?;
            }
            ActionKind::Heartbeat => {
                let current_time = payload
                    .get("currentTime")
                    .and_then(|v| v.as_str())
                    .and_then(parse_rfc3339)
                    .unwrap_or_else(Utc::now);
                with_timeout(self.store_timeout, &self.shutdown, async {
                    Ok(self
                        .store
                        .update_last_heartbeat(&meta.serial_number, current_time)
                        .await?)
                })
                .await?;
            }
            other => {
                return Err(EngineError::UnsupportedAction {
                    action: other.to_string(),
                    mode: "relay-completion".to_string(),
                })
            }
        }

        with_timeout(self.cache_timeout, &self.shutdown, async {
            Ok(self.cache.remove_request(meta, &unique_id).await?)
        })
        .await?;
        Ok(None)
    }
}

fn parse_rfc3339(s: &str) -> Option<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn boot_notification_info(serial_number: &str, payload: &Value) -> BootNotificationInfo {
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };
    BootNotificationInfo {
        serial_number: serial_number.to_string(),
        vendor: field("chargePointVendor").unwrap_or_default(),
        model: field("chargePointModel").unwrap_or_default(),
        firmware_version: field("firmwareVersion"),
        iccid: field("iccid"),
        imsi: field("imsi"),
        meter_serial_number: field("meterSerialNumber"),
        meter_type: field("meterType"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DashMapCorrelator;
    use crate::store::InMemoryChargePointStore;

    fn build_engine() -> OcppEngine {
        OcppEngine::builder()
            .with_cache(Arc::new(DashMapCorrelator::default()))
            .with_store(Arc::new(InMemoryChargePointStore::new()))
            .build()
            .unwrap()
    }

    fn meta(broker_id: &str, serial: &str) -> Meta {
        Meta {
            broker_id: broker_id.to_string(),
            serial_number: serial.to_string(),
        }
    }

    #[tokio::test]
    async fn heartbeat_proxy_scenario() {
        let engine = build_engine();
        let boot = br#"[2,"uuid-0","BootNotification",{"chargePointModel":"Zappi","chargePointVendor":"Myenergi"}]"#;
        engine.handle(&meta("b0", "SN1"), boot).await.unwrap();

        let msg = br#"[2,"uuid-1","Heartbeat",{}]"#;
        let reply = engine.handle(&meta("b1", "SN1"), msg).await.unwrap();
        assert!(reply.is_some());
        let frame = OcppFrame::parse(std::str::from_utf8(&reply.unwrap()).unwrap()).unwrap();
        assert!(frame.is_call_result());
    }

    #[tokio::test]
    async fn boot_notification_proxy_scenario() {
        let engine = build_engine();
        let msg = br#"[2,"uuid-2","BootNotification",{"chargePointModel":"Zappi","chargePointVendor":"Myenergi","chargeBoxSerialNumber":"91234567","chargePointSerialNumber":"91234567","firmwareVersion":"5540","meterSerialNumber":"91234567"}]"#;
        let reply = engine
            .handle(&meta("b2", "91234567"), msg)
            .await
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&reply).unwrap();
        assert!(text.contains("Accepted"));
    }

    #[tokio::test]
    async fn unknown_action_is_malformed_frame() {
        let engine = build_engine();
        let msg = br#"[2,"uuid-3","FrobnicateConnector",{}]"#;
        let err = engine.handle(&meta("b3", "SN1"), msg).await.unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrame(_)));
    }

    #[tokio::test]
    async fn unmatched_confirmation_is_rejected() {
        let engine = build_engine();
        let msg = br#"[3,"uuid-unknown",{"currentTime":"2024-04-02T11:44:38Z"}]"#;
        let err = engine.handle(&meta("b4", "SN1"), msg).await.unwrap_err();
        assert!(matches!(err, EngineError::UnmatchedConfirmation { .. }));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_a_no_op() {
        let engine = build_engine();
        let msg = br#"[2,"uuid-1","Heartbeat",{}]"#;
        let first = engine.handle(&meta("b5", "SN1"), msg).await.unwrap();
        assert!(first.is_some());
        let second = engine.handle(&meta("b5", "SN1"), msg).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn schema_failure_on_missing_vendor() {
        let engine = build_engine();
        let msg = br#"[2,"uuid-4","BootNotification",{"chargePointModel":"Zappi"}]"#;
        let err = engine.handle(&meta("b6", "SN1"), msg).await.unwrap_err();
        assert!(matches!(err, EngineError::SchemaValidation { .. }));
    }

    #[tokio::test]
    async fn shutdown_mid_flight_cancels_rather_than_completes() {
        let shutdown = ShutdownSignal::new();
        let engine = OcppEngine::builder()
            .with_cache(Arc::new(DashMapCorrelator::default()))
            .with_store(Arc::new(InMemoryChargePointStore::new()))
            .with_shutdown_signal(shutdown.clone())
            .build()
            .unwrap();

        shutdown.trigger();
        let msg = br#"[2,"uuid-6","Heartbeat",{}]"#;
        let err = engine.handle(&meta("b8", "SN1"), msg).await.unwrap_err();
        match err {
            EngineError::Transient(TransientError::Cancelled) => {}
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn relay_mode_stores_pending_request_without_reply() {
        struct AlwaysRelay;
        impl ModeSelector for AlwaysRelay {
            fn select(&self, _action: ActionKind) -> Mode {
                Mode::Relay
            }
        }
        let engine = OcppEngine::builder()
            .with_cache(Arc::new(DashMapCorrelator::default()))
            .with_store(Arc::new(InMemoryChargePointStore::new()))
            .with_mode_selector(Arc::new(AlwaysRelay))
            .build()
            .unwrap();

        let msg = br#"[2,"uuid-5","Heartbeat",{}]"#;
        let reply = engine.handle(&meta("b7", "SN1"), msg).await.unwrap();
        assert!(reply.is_none());

        let pending = engine.cache.get_request("uuid-5").await.unwrap();
        assert_eq!(pending.action, ActionKind::Heartbeat);
    }
}
