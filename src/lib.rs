//! # ocpp-bridge
//!
//! A stateful protocol bridge for OCPP 1.6-J carried over an asynchronous
//! message bus: it parses and validates Call/CallResult frames, correlates
//! confirmations to earlier requests via a TTL-backed cache, updates a
//! durable charge-point registry, and drives replies back onto the bus.
//!
//! - **ocpp**: wire format — action set, frame codec, schema validation.
//! - **cache**: the correlator (at-most-once bookkeeping + request pairing).
//! - **store**: the durable charge-point registry.
//! - **engine**: the state machine that ties codec, cache, and store together.
//! - **transport**: binds the engine to an abstract message bus.
//! - **config**: TOML-backed `AppConfig`.
//! - **shutdown**: broadcast-based graceful shutdown coordination.
//! - **errors**: the engine-facing error taxonomy.
//! - **metrics**: transport-loop instrumentation points.

pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod ocpp;
pub mod shutdown;
pub mod store;
pub mod transport;

pub use config::{default_config_path, AppConfig};
pub use engine::OcppEngine;
pub use errors::EngineError;
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
