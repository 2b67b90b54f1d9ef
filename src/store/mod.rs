//! Durable charge-point registry: one table, two write operations.

pub mod entity;
pub mod memory;
pub mod migrator;
pub mod sea_orm;
pub mod traits;

pub use memory::InMemoryChargePointStore;
pub use sea_orm::SeaOrmChargePointStore;
pub use traits::{BootNotificationInfo, ChargePoint, ChargePointStore, StoreError};
