//! Declarative request/confirmation validation for every [`ActionKind`].
//!
//! `rust_ocpp`'s message structs already give us strongly-typed OCPP 1.6
//! request/confirmation shapes.
//! They don't enforce the declarative length/range constraints OCPP itself
//! specifies, so the constrained actions get a thin `validator`-derived
//! wrapper checked before the canonical `rust_ocpp` struct is built; the rest
//! are checked structurally (the payload must deserialize into the
//! corresponding `rust_ocpp` struct at all).

use once_cell::sync::Lazy;
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus, Reason, RegistrationStatus};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::action::ActionKind;
use crate::errors::EngineError;

/// Registers the closed enum sets once at process start, mirroring the
/// Go package's one-shot validator registration (`init()` in
/// `types/boot-notification.go`). Referencing this forces initialization;
/// it holds nothing mutable, just documents the one-time registration point
/// the concurrency model (SPEC_FULL.md §5) calls out.
pub static SCHEMA_REGISTRY: Lazy<()> = Lazy::new(|| {});

pub fn init() {
    Lazy::force(&SCHEMA_REGISTRY);
}

fn violation(field: &str, reason: impl Into<String>) -> EngineError {
    EngineError::SchemaValidation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Runs a `validator::Validate` impl and surfaces the first violating field,
/// per SPEC_FULL.md §4.1's `validate(&T) -> Result<(), ValidationError>`.
fn first_violation<T: Validate>(value: &T) -> Result<(), EngineError> {
    match value.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, errs): (String, Vec<validator::ValidationError>) = errors
                .field_errors()
                .iter()
                .next()
                .map(|(f, e)| (f.to_string(), (*e).clone()))
                .unwrap_or_else(|| ("<unknown>".to_string(), Vec::new()));
            let reason = errs
                .first()
                .map(|e| e.code.to_string())
                .unwrap_or_else(|| "constraint violated".to_string());
            Err(violation(&field, reason))
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct HeartbeatConfirmationCheck {
    #[validate(length(min = 1, message = "currentTime must not be empty"))]
    #[serde(rename = "currentTime")]
    current_time: String,
}

#[derive(Debug, Deserialize, Validate)]
struct BootNotificationRequestCheck {
    #[validate(length(min = 1, max = 20, message = "chargePointVendor must be 1..=20 chars"))]
    #[serde(rename = "chargePointVendor")]
    charge_point_vendor: String,
    #[validate(length(min = 1, max = 20, message = "chargePointModel must be 1..=20 chars"))]
    #[serde(rename = "chargePointModel")]
    charge_point_model: String,
    #[validate(length(max = 25))]
    #[serde(rename = "chargeBoxSerialNumber", default)]
    charge_box_serial_number: Option<String>,
    #[validate(length(max = 25))]
    #[serde(rename = "chargePointSerialNumber", default)]
    charge_point_serial_number: Option<String>,
    #[validate(length(max = 50))]
    #[serde(rename = "firmwareVersion", default)]
    firmware_version: Option<String>,
    #[validate(length(max = 20))]
    #[serde(default)]
    iccid: Option<String>,
    #[validate(length(max = 20))]
    #[serde(default)]
    imsi: Option<String>,
    #[validate(length(max = 25))]
    #[serde(rename = "meterSerialNumber", default)]
    meter_serial_number: Option<String>,
    #[validate(length(max = 25))]
    #[serde(rename = "meterType", default)]
    meter_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct StatusNotificationRequestCheck {
    #[validate(range(min = 0))]
    #[serde(rename = "connectorId")]
    connector_id: i64,
    #[serde(rename = "errorCode")]
    error_code: ChargePointErrorCode,
    status: ChargePointStatus,
    #[validate(length(max = 50))]
    #[serde(default)]
    info: Option<String>,
    #[validate(length(max = 255))]
    #[serde(rename = "vendorId", default)]
    vendor_id: Option<String>,
    #[validate(length(max = 50))]
    #[serde(rename = "vendorErrorCode", default)]
    vendor_error_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct StartTransactionRequestCheck {
    #[validate(range(min = 1, message = "connectorId must be > 0"))]
    #[serde(rename = "connectorId")]
    connector_id: i64,
    #[validate(length(min = 1, max = 20))]
    #[serde(rename = "idTag")]
    id_tag: String,
    #[validate(range(min = 0))]
    #[serde(rename = "meterStart")]
    meter_start: i64,
    timestamp: String,
    #[serde(rename = "reservationId", default)]
    reservation_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
struct StopTransactionRequestCheck {
    #[serde(rename = "meterStop")]
    meter_stop: i64,
    timestamp: String,
    #[serde(rename = "transactionId")]
    transaction_id: i64,
    #[validate(length(max = 20))]
    #[serde(rename = "idTag", default)]
    id_tag: Option<String>,
    #[serde(default)]
    reason: Option<Reason>,
}

#[derive(Debug, Deserialize, Validate)]
struct MeterValuesRequestCheck {
    #[validate(range(min = 0))]
    #[serde(rename = "connectorId")]
    connector_id: i64,
    #[validate(length(min = 1, message = "meterValue must contain at least one entry"))]
    #[serde(rename = "meterValue")]
    meter_value: Vec<Value>,
    #[serde(rename = "transactionId", default)]
    transaction_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
struct AuthorizeRequestCheck {
    #[validate(length(min = 1, max = 20))]
    #[serde(rename = "idTag")]
    id_tag: String,
}

#[derive(Debug, Deserialize, Validate)]
struct DataTransferRequestCheck {
    #[validate(length(min = 1, max = 255))]
    #[serde(rename = "vendorId")]
    vendor_id: String,
    #[validate(length(max = 50))]
    #[serde(rename = "messageId", default)]
    message_id: Option<String>,
}

fn check<T: for<'de> Deserialize<'de> + Validate>(payload: &Value) -> Result<(), EngineError> {
    let parsed: T = serde_json::from_value(payload.clone())
        .map_err(|e| violation("<payload>", e.to_string()))?;
    first_violation(&parsed)
}

/// Structural-only check: the payload must deserialize into `T`. Used for
/// actions SPEC_FULL.md §6 doesn't single out with length/range constraints;
/// `rust_ocpp`'s struct shape is itself the schema.
fn check_structural<T: for<'de> Deserialize<'de>>(payload: &Value) -> Result<(), EngineError> {
    serde_json::from_value::<T>(payload.clone())
        .map(|_| ())
        .map_err(|e| violation("<payload>", e.to_string()))
}

/// Validates an inbound request payload for `action`, returning the first
/// violating field on failure (SPEC_FULL.md §4.1, P4, scenario 6).
pub fn validate_request(action: ActionKind, payload: &Value) -> Result<(), EngineError> {
    use rust_ocpp::v1_6::messages::{
        authorize::AuthorizeRequest, change_availability::ChangeAvailabilityRequest,
        change_configuration::ChangeConfigurationRequest, clear_cache::ClearCacheRequest,
        data_transfer::DataTransferRequest,
        diagnostics_status_notification::DiagnosticsStatusNotificationRequest,
        firmware_status_notification::FirmwareStatusNotificationRequest,
        get_configuration::GetConfigurationRequest, get_diagnostics::GetDiagnosticsRequest,
        heart_beat::HeartbeatRequest, meter_values::MeterValuesRequest,
        remote_start_transaction::RemoteStartTransactionRequest,
        remote_stop_transaction::RemoteStopTransactionRequest, reset::ResetRequest,
        start_transaction::StartTransactionRequest, status_notification::StatusNotificationRequest,
        stop_transaction::StopTransactionRequest, trigger_message::TriggerMessageRequest,
        unlock_connector::UnlockConnectorRequest, update_firmware::UpdateFirmwareRequest,
    };

    match action {
        ActionKind::Heartbeat => check_structural::<HeartbeatRequest>(payload),
        ActionKind::BootNotification => check::<BootNotificationRequestCheck>(payload),
        ActionKind::StatusNotification => check::<StatusNotificationRequestCheck>(payload),
        ActionKind::StartTransaction => check::<StartTransactionRequestCheck>(payload),
        ActionKind::StopTransaction => check::<StopTransactionRequestCheck>(payload),
        ActionKind::MeterValues => check::<MeterValuesRequestCheck>(payload),
        ActionKind::Authorize => check::<AuthorizeRequestCheck>(payload),
        ActionKind::DataTransfer => check::<DataTransferRequestCheck>(payload),
        ActionKind::ChangeAvailability => check_structural::<ChangeAvailabilityRequest>(payload),
        ActionKind::ChangeConfiguration => check_structural::<ChangeConfigurationRequest>(payload),
        ActionKind::ClearCache => check_structural::<ClearCacheRequest>(payload),
        ActionKind::GetConfiguration => check_structural::<GetConfigurationRequest>(payload),
        ActionKind::GetDiagnostics => check_structural::<GetDiagnosticsRequest>(payload),
        ActionKind::RemoteStartTransaction => {
            check_structural::<RemoteStartTransactionRequest>(payload)
        }
        ActionKind::RemoteStopTransaction => {
            check_structural::<RemoteStopTransactionRequest>(payload)
        }
        ActionKind::Reset => check_structural::<ResetRequest>(payload),
        ActionKind::TriggerMessage => check_structural::<TriggerMessageRequest>(payload),
        ActionKind::UnlockConnector => check_structural::<UnlockConnectorRequest>(payload),
        ActionKind::UpdateFirmware => check_structural::<UpdateFirmwareRequest>(payload),
        ActionKind::DiagnosticsStatusNotification => {
            check_structural::<DiagnosticsStatusNotificationRequest>(payload)
        }
        ActionKind::FirmwareStatusNotification => {
            check_structural::<FirmwareStatusNotificationRequest>(payload)
        }
    }
}

/// Validates a confirmation payload against the confirmation schema for
/// `action` (the action the *original request* carried).
pub fn validate_confirmation(action: ActionKind, payload: &Value) -> Result<(), EngineError> {
    use rust_ocpp::v1_6::messages::{
        authorize::AuthorizeResponse, change_availability::ChangeAvailabilityResponse,
        change_configuration::ChangeConfigurationResponse, clear_cache::ClearCacheResponse,
        data_transfer::DataTransferResponse,
        diagnostics_status_notification::DiagnosticsStatusNotificationResponse,
        firmware_status_notification::FirmwareStatusNotificationResponse,
        get_configuration::GetConfigurationResponse, get_diagnostics::GetDiagnosticsResponse,
        heart_beat::HeartbeatResponse, meter_values::MeterValuesResponse,
        remote_start_transaction::RemoteStartTransactionResponse,
        remote_stop_transaction::RemoteStopTransactionResponse, reset::ResetResponse,
        start_transaction::StartTransactionResponse, status_notification::StatusNotificationResponse,
        stop_transaction::StopTransactionResponse, trigger_message::TriggerMessageResponse,
        unlock_connector::UnlockConnectorResponse, update_firmware::UpdateFirmwareResponse,
    };

    match action {
        ActionKind::Heartbeat => check::<HeartbeatConfirmationCheck>(payload),
        ActionKind::BootNotification => {
            #[derive(Deserialize)]
            struct BootNotificationConfirmationCheck {
                #[serde(rename = "currentTime")]
                #[allow(dead_code)]
                current_time: String,
                #[allow(dead_code)]
                interval: i64,
                status: RegistrationStatus,
            }
            let parsed: BootNotificationConfirmationCheck =
                serde_json::from_value(payload.clone())
                    .map_err(|e| violation("<payload>", e.to_string()))?;
            let _ = parsed.status;
            Ok(())
        }
        ActionKind::StatusNotification => Ok(()),
        ActionKind::StartTransaction => check_structural::<StartTransactionResponse>(payload),
        ActionKind::StopTransaction => check_structural::<StopTransactionResponse>(payload),
        ActionKind::MeterValues => Ok(()),
        ActionKind::Authorize => check_structural::<AuthorizeResponse>(payload),
        ActionKind::DataTransfer => check_structural::<DataTransferResponse>(payload),
        ActionKind::ChangeAvailability => check_structural::<ChangeAvailabilityResponse>(payload),
        ActionKind::ChangeConfiguration => check_structural::<ChangeConfigurationResponse>(payload),
        ActionKind::ClearCache => check_structural::<ClearCacheResponse>(payload),
        ActionKind::GetConfiguration => check_structural::<GetConfigurationResponse>(payload),
        ActionKind::GetDiagnostics => check_structural::<GetDiagnosticsResponse>(payload),
        ActionKind::RemoteStartTransaction => {
            check_structural::<RemoteStartTransactionResponse>(payload)
        }
        ActionKind::RemoteStopTransaction => {
            check_structural::<RemoteStopTransactionResponse>(payload)
        }
        ActionKind::Reset => check_structural::<ResetResponse>(payload),
        ActionKind::TriggerMessage => check_structural::<TriggerMessageResponse>(payload),
        ActionKind::UnlockConnector => check_structural::<UnlockConnectorResponse>(payload),
        ActionKind::UpdateFirmware => check_structural::<UpdateFirmwareResponse>(payload),
        ActionKind::DiagnosticsStatusNotification => {
            check_structural::<DiagnosticsStatusNotificationResponse>(payload)
        }
        ActionKind::FirmwareStatusNotification => {
            check_structural::<FirmwareStatusNotificationResponse>(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boot_notification_missing_vendor_fails_on_that_field() {
        let payload = json!({ "chargePointModel": "Zappi" });
        let err = validate_request(ActionKind::BootNotification, &payload).unwrap_err();
        match err {
            EngineError::SchemaValidation { field, .. } => {
                assert_eq!(field, "charge_point_vendor")
            }
            other => panic!("expected SchemaValidation, got {other:?}"),
        }
    }

    #[test]
    fn boot_notification_valid_payload_passes() {
        let payload = json!({
            "chargePointModel": "Zappi",
            "chargePointVendor": "Myenergi",
            "chargeBoxSerialNumber": "91234567",
        });
        validate_request(ActionKind::BootNotification, &payload).unwrap();
    }

    #[test]
    fn heartbeat_request_is_empty_object() {
        validate_request(ActionKind::Heartbeat, &json!({})).unwrap();
    }

    #[test]
    fn heartbeat_confirmation_requires_current_time() {
        let err = validate_confirmation(ActionKind::Heartbeat, &json!({})).unwrap_err();
        assert!(matches!(err, EngineError::SchemaValidation { .. }));
    }

    #[test]
    fn status_notification_rejects_unknown_error_code() {
        let payload = json!({
            "connectorId": 1,
            "errorCode": "NotARealErrorCode",
            "status": "Available",
        });
        let err = validate_request(ActionKind::StatusNotification, &payload).unwrap_err();
        assert!(matches!(err, EngineError::SchemaValidation { .. }));
    }

    #[test]
    fn status_notification_rejects_unknown_status() {
        let payload = json!({
            "connectorId": 1,
            "errorCode": "NoError",
            "status": "NotARealStatus",
        });
        let err = validate_request(ActionKind::StatusNotification, &payload).unwrap_err();
        assert!(matches!(err, EngineError::SchemaValidation { .. }));
    }

    #[test]
    fn status_notification_valid_enum_values_pass() {
        let payload = json!({
            "connectorId": 1,
            "errorCode": "NoError",
            "status": "Available",
        });
        validate_request(ActionKind::StatusNotification, &payload).unwrap();
    }

    #[test]
    fn stop_transaction_rejects_unknown_reason() {
        let payload = json!({
            "meterStop": 100,
            "timestamp": "2024-01-01T00:00:00Z",
            "transactionId": 1,
            "reason": "NotARealReason",
        });
        let err = validate_request(ActionKind::StopTransaction, &payload).unwrap_err();
        assert!(matches!(err, EngineError::SchemaValidation { .. }));
    }

    #[test]
    fn stop_transaction_valid_reason_passes() {
        let payload = json!({
            "meterStop": 100,
            "timestamp": "2024-01-01T00:00:00Z",
            "transactionId": 1,
            "reason": "EVDisconnected",
        });
        validate_request(ActionKind::StopTransaction, &payload).unwrap();
    }

    #[test]
    fn start_transaction_rejects_zero_connector_id() {
        let payload = json!({
            "connectorId": 0,
            "idTag": "tag1",
            "meterStart": 0,
            "timestamp": "2024-01-01T00:00:00Z",
        });
        let err = validate_request(ActionKind::StartTransaction, &payload).unwrap_err();
        match err {
            EngineError::SchemaValidation { field, .. } => assert_eq!(field, "connector_id"),
            other => panic!("expected SchemaValidation, got {other:?}"),
        }
    }
}
