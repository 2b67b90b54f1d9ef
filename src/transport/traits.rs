//! The abstract message-bus transport the engine is bound to. Grounded in
//! `original_source/internal/core/azure-service-bus-client.go`'s
//! `AzureServiceBusClient`/`ReceiveMessages` shape — the concrete bus client
//! itself is out of scope (SPEC_FULL.md §1); only this interface is modeled.

use async_trait::async_trait;
use thiserror::Error;

/// One inbound message pulled off the bus.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Broker-assigned unique id (distinct from the OCPP `UniqueId`).
    pub id: String,
    pub body: Vec<u8>,
    /// The `serialnumber` application property (SPEC_FULL.md §6).
    pub serial_number: String,
}

/// A message to publish to the outbound topic.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub id: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("cancelled")]
    Cancelled,
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Blocks until at least one message is available, returning up to `max`.
    async fn receive(&self, max: usize) -> Result<Vec<InboundMessage>, TransportError>;

    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Final ack: the bus will not redeliver this message.
    async fn complete(&self, message_id: &str) -> Result<(), TransportError>;

    /// Releases the message back to the bus for redelivery.
    async fn abandon(&self, message_id: &str) -> Result<(), TransportError>;
}
