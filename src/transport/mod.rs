//! Transport loop: binds the engine to an abstract message bus.

pub mod loop_;
pub mod memory;
pub mod traits;

pub use loop_::{run_transport_loop, TransportLoopConfig};
pub use memory::InMemoryTransport;
pub use traits::{InboundMessage, MessageTransport, OutboundMessage, TransportError};
