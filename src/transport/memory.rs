//! Channel-backed [`MessageTransport`] double, used by tests and local runs
//! in place of the message-bus client (out of scope per SPEC_FULL.md §1).

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use super::traits::{InboundMessage, MessageTransport, OutboundMessage, TransportError};

pub struct InMemoryTransport {
    inbound_rx: AsyncMutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    outbound: Mutex<Vec<OutboundMessage>>,
    completed: Mutex<Vec<String>>,
    abandoned: Mutex<Vec<String>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            inbound_rx: AsyncMutex::new(rx),
            inbound_tx: tx,
            outbound: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            abandoned: Mutex::new(Vec::new()),
        }
    }

    /// Test helper: enqueue a message as if it arrived on the bus.
    pub async fn push(&self, message: InboundMessage) {
        self.inbound_tx
            .send(message)
            .await
            .expect("inbound channel closed");
    }

    pub fn outbound(&self) -> Vec<OutboundMessage> {
        self.outbound.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn abandoned(&self) -> Vec<String> {
        self.abandoned.lock().unwrap().clone()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageTransport for InMemoryTransport {
    async fn receive(&self, max: usize) -> Result<Vec<InboundMessage>, TransportError> {
        let mut rx = self.inbound_rx.lock().await;
        let mut batch = Vec::new();
        if let Some(first) = rx.recv().await {
            batch.push(first);
            while batch.len() < max {
                match rx.try_recv() {
                    Ok(msg) => batch.push(msg),
                    Err(_) => break,
                }
            }
        }
        Ok(batch)
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.outbound.lock().unwrap().push(message);
        Ok(())
    }

    async fn complete(&self, message_id: &str) -> Result<(), TransportError> {
        self.completed.lock().unwrap().push(message_id.to_string());
        Ok(())
    }

    async fn abandon(&self, message_id: &str) -> Result<(), TransportError> {
        self.abandoned.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}
