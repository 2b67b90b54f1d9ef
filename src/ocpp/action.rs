//! The closed set of OCPP 1.6 actions this engine recognizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OCPP 1.6 action names, as they appear verbatim (case-sensitive) in the
/// wire envelope's `Action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Authorize,
    BootNotification,
    ChangeAvailability,
    ChangeConfiguration,
    ClearCache,
    DataTransfer,
    DiagnosticsStatusNotification,
    FirmwareStatusNotification,
    GetConfiguration,
    GetDiagnostics,
    Heartbeat,
    MeterValues,
    RemoteStartTransaction,
    RemoteStopTransaction,
    Reset,
    StartTransaction,
    StatusNotification,
    StopTransaction,
    TriggerMessage,
    UnlockConnector,
    UpdateFirmware,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "Authorize",
            Self::BootNotification => "BootNotification",
            Self::ChangeAvailability => "ChangeAvailability",
            Self::ChangeConfiguration => "ChangeConfiguration",
            Self::ClearCache => "ClearCache",
            Self::DataTransfer => "DataTransfer",
            Self::DiagnosticsStatusNotification => "DiagnosticsStatusNotification",
            Self::FirmwareStatusNotification => "FirmwareStatusNotification",
            Self::GetConfiguration => "GetConfiguration",
            Self::GetDiagnostics => "GetDiagnostics",
            Self::Heartbeat => "Heartbeat",
            Self::MeterValues => "MeterValues",
            Self::RemoteStartTransaction => "RemoteStartTransaction",
            Self::RemoteStopTransaction => "RemoteStopTransaction",
            Self::Reset => "Reset",
            Self::StartTransaction => "StartTransaction",
            Self::StatusNotification => "StatusNotification",
            Self::StopTransaction => "StopTransaction",
            Self::TriggerMessage => "TriggerMessage",
            Self::UnlockConnector => "UnlockConnector",
            Self::UpdateFirmware => "UpdateFirmware",
        }
    }

    pub const ALL: &'static [ActionKind] = &[
        Self::Authorize,
        Self::BootNotification,
        Self::ChangeAvailability,
        Self::ChangeConfiguration,
        Self::ClearCache,
        Self::DataTransfer,
        Self::DiagnosticsStatusNotification,
        Self::FirmwareStatusNotification,
        Self::GetConfiguration,
        Self::GetDiagnostics,
        Self::Heartbeat,
        Self::MeterValues,
        Self::RemoteStartTransaction,
        Self::RemoteStopTransaction,
        Self::Reset,
        Self::StartTransaction,
        Self::StatusNotification,
        Self::StopTransaction,
        Self::TriggerMessage,
        Self::UnlockConnector,
        Self::UpdateFirmware,
    ];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_as_str() {
        for action in ActionKind::ALL {
            let parsed: ActionKind = action.as_str().parse().unwrap();
            assert_eq!(parsed, *action);
        }
    }

    #[test]
    fn unknown_action_rejected() {
        assert!("FrobnicateConnector".parse::<ActionKind>().is_err());
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("heartbeat".parse::<ActionKind>().is_err());
    }
}
