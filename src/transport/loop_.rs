//! Binds the [`OcppEngine`] to a [`MessageTransport`], grounded in
//! `original_source/service/ocpp/start.go`'s `Start` receive loop.
//!
//! One redesign versus the source: `start.go` always calls
//! `receiver.CompleteMessage` regardless of the handling outcome (its own
//! TODO comment flags the commented-out abandon path as unfinished).
//! SPEC_FULL.md's §9 Open Question resolves this by actually abandoning on
//! `Transient` errors so the bus redelivers them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::cache::Meta;
use crate::engine::OcppEngine;
use crate::errors::EngineError;
use crate::shutdown::ShutdownSignal;

use super::traits::{MessageTransport, OutboundMessage, TransportError};

#[derive(Clone, Copy)]
pub struct TransportLoopConfig {
    pub receive_batch: usize,
    pub send_timeout: Duration,
}

impl Default for TransportLoopConfig {
    fn default() -> Self {
        Self {
            receive_batch: 10,
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// Runs the receive/dispatch/ack loop until `shutdown` fires. Spawns one
/// short-lived task per message, bounded by a `JoinSet` so handling runs
/// concurrently while ordering per `broker_id` is preserved (a single
/// message is always handled start-to-finish by one task).
pub async fn run_transport_loop(
    transport: Arc<dyn MessageTransport>,
    engine: Arc<OcppEngine>,
    shutdown: ShutdownSignal,
    config: TransportLoopConfig,
) {
    let mut in_flight = JoinSet::new();

    loop {
        if shutdown.is_triggered() {
            break;
        }

        let batch = tokio::select! {
            result = transport.receive(config.receive_batch) => match result {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "transport receive failed");
                    continue;
                }
            },
            _ = shutdown.wait() => break,
        };

        for msg in batch {
            let transport = transport.clone();
            let engine = engine.clone();
            let send_timeout = config.send_timeout;
            let shutdown = shutdown.clone();
            in_flight.spawn(async move {
                handle_one(transport, engine, msg, send_timeout, shutdown).await;
            });
        }
    }

    info!("transport loop stopping, draining in-flight work");
    while in_flight.join_next().await.is_some() {}
}

/// Disposition of the outbound send, including the case where shutdown fires
/// while the send is in flight.
enum SendOutcome {
    Sent,
    TimedOut,
    Cancelled,
    Failed(TransportError),
}

async fn handle_one(
    transport: Arc<dyn MessageTransport>,
    engine: Arc<OcppEngine>,
    msg: super::traits::InboundMessage,
    send_timeout: Duration,
    shutdown: ShutdownSignal,
) {
    crate::metrics::record_received();
    let started = std::time::Instant::now();

    let meta = Meta {
        broker_id: msg.id.clone(),
        serial_number: msg.serial_number.clone(),
    };

    let outcome = engine.handle(&meta, &msg.body).await;
    crate::metrics::record_handling_latency(started.elapsed().as_secs_f64());

    match outcome {
        Err(e) if e.is_transient() => {
            warn!(broker_id = %msg.id, error = %e, "transient failure, abandoning");
            let _ = transport.abandon(&msg.id).await;
            crate::metrics::record_abandoned();
        }
        Err(e) => {
            warn!(broker_id = %msg.id, error = %e, "permanent failure, abandoning");
            let _ = transport.abandon(&msg.id).await;
            crate::metrics::record_abandoned();
        }
        Ok(reply) => {
            let body = reply.unwrap_or_else(|| {
                serde_json::to_vec(&serde_json::json!({"status": "processed", "response": {}}))
                    .expect("static json never fails to serialize")
            });
            let send_outcome = if shutdown.is_triggered() {
                SendOutcome::Cancelled
            } else {
                tokio::select! {
                    result = timeout(send_timeout, transport.send(OutboundMessage {
                        id: msg.id.clone(),
                        body,
                    })) => match result {
                        Ok(Ok(())) => SendOutcome::Sent,
                        Ok(Err(e)) => SendOutcome::Failed(e),
                        Err(_) => SendOutcome::TimedOut,
                    },
                    _ = shutdown.notified().wait() => SendOutcome::Cancelled,
                }
            };

            match send_outcome {
                SendOutcome::Sent => {
                    let _ = transport.complete(&msg.id).await;
                    crate::metrics::record_completed();
                }
                SendOutcome::Failed(e) => {
                    error!(broker_id = %msg.id, error = %e, "outbound send failed, abandoning");
                    let _ = transport.abandon(&msg.id).await;
                    crate::metrics::record_abandoned();
                }
                SendOutcome::TimedOut => {
                    error!(broker_id = %msg.id, "outbound send timed out, abandoning");
                    let _ = transport.abandon(&msg.id).await;
                    crate::metrics::record_abandoned();
                }
                SendOutcome::Cancelled => {
                    let reason = TransportError::Cancelled;
                    warn!(broker_id = %msg.id, error = %reason, "shutdown triggered mid-send, abandoning");
                    let _ = transport.abandon(&msg.id).await;
                    crate::metrics::record_abandoned();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DashMapCorrelator;
    use crate::store::InMemoryChargePointStore;
    use crate::transport::memory::InMemoryTransport;
    use crate::transport::traits::InboundMessage;
    use std::sync::Arc;

    fn build_engine() -> Arc<OcppEngine> {
        Arc::new(
            OcppEngine::builder()
                .with_cache(Arc::new(DashMapCorrelator::default()))
                .with_store(Arc::new(InMemoryChargePointStore::new()))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn heartbeat_message_completes_and_sends_reply() {
        let transport = Arc::new(InMemoryTransport::new());
        let engine = build_engine();
        let shutdown = ShutdownSignal::new();

        transport
            .push(InboundMessage {
                id: "b0".into(),
                body: br#"[2,"uuid-0","BootNotification",{"chargePointModel":"Zappi","chargePointVendor":"Myenergi"}]"#.to_vec(),
                serial_number: "SN1".into(),
            })
            .await;
        transport
            .push(InboundMessage {
                id: "b1".into(),
                body: br#"[2,"uuid-1","Heartbeat",{}]"#.to_vec(),
                serial_number: "SN1".into(),
            })
            .await;

        let loop_transport = transport.clone();
        let loop_shutdown = shutdown.clone();
        let handle = tokio::spawn(run_transport_loop(
            loop_transport,
            engine,
            loop_shutdown,
            TransportLoopConfig::default(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
        handle.await.unwrap();

        assert!(transport.completed().contains(&"b1".to_string()));
        assert_eq!(transport.outbound().len(), 2);
        assert!(transport.abandoned().is_empty());
    }

    #[tokio::test]
    async fn shutdown_during_send_abandons_instead_of_completing() {
        let transport = Arc::new(InMemoryTransport::new());
        let engine = build_engine();
        let shutdown = ShutdownSignal::new();

        transport
            .push(InboundMessage {
                id: "b3".into(),
                body: br#"[2,"uuid-7","BootNotification",{"chargePointModel":"Zappi","chargePointVendor":"Myenergi"}]"#.to_vec(),
                serial_number: "SN1".into(),
            })
            .await;
        let boot_batch = transport.receive(10).await.unwrap();
        handle_one(
            transport.clone(),
            engine.clone(),
            boot_batch.into_iter().next().unwrap(),
            Duration::from_secs(10),
            shutdown.clone(),
        )
        .await;

        shutdown.trigger();

        transport
            .push(InboundMessage {
                id: "b4".into(),
                body: br#"[2,"uuid-8","Heartbeat",{}]"#.to_vec(),
                serial_number: "SN1".into(),
            })
            .await;
        let heartbeat_batch = transport.receive(10).await.unwrap();
        handle_one(
            transport.clone(),
            engine,
            heartbeat_batch.into_iter().next().unwrap(),
            Duration::from_secs(10),
            shutdown,
        )
        .await;

        assert!(transport.abandoned().contains(&"b4".to_string()));
        assert!(!transport.completed().contains(&"b4".to_string()));
    }

    #[tokio::test]
    async fn malformed_message_is_abandoned() {
        let transport = Arc::new(InMemoryTransport::new());
        let engine = build_engine();
        let shutdown = ShutdownSignal::new();

        transport
            .push(InboundMessage {
                id: "b2".into(),
                body: br#"[2,"uuid-3","FrobnicateConnector",{}]"#.to_vec(),
                serial_number: "SN1".into(),
            })
            .await;

        let loop_transport = transport.clone();
        let loop_shutdown = shutdown.clone();
        let handle = tokio::spawn(run_transport_loop(
            loop_transport,
            engine,
            loop_shutdown,
            TransportLoopConfig::default(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
        handle.await.unwrap();

        assert_eq!(transport.abandoned(), vec!["b2".to_string()]);
        assert!(transport.completed().is_empty());
    }
}
