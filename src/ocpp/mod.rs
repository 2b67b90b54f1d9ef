//! OCPP 1.6-J wire format: the closed action set, the envelope codec, and
//! per-action schema validation.

pub mod action;
pub mod frame;
pub mod schema;

pub use action::ActionKind;
pub use frame::{OcppFrame, OcppFrameError};
