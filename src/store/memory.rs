//! `DashMap`-backed `ChargePointStore`, grounded in
//! `InMemoryStorage` (`infrastructure/storage/memory.rs`). Used by tests and
//! local/dev runs in place of `SeaOrmChargePointStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::traits::{BootNotificationInfo, ChargePoint, ChargePointStore, StoreError};

#[derive(Default)]
pub struct InMemoryChargePointStore {
    charge_points: DashMap<String, ChargePoint>,
}

impl InMemoryChargePointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChargePointStore for InMemoryChargePointStore {
    async fn add_chargepoint(&self, info: BootNotificationInfo) -> Result<(), StoreError> {
        let now = Utc::now();
        self.charge_points
            .entry(info.serial_number.clone())
            .and_modify(|cp| {
                cp.vendor = info.vendor.clone();
                cp.model = info.model.clone();
                cp.firmware_version = info.firmware_version.clone();
                cp.iccid = info.iccid.clone();
                cp.imsi = info.imsi.clone();
                cp.meter_serial_number = info.meter_serial_number.clone();
                cp.meter_type = info.meter_type.clone();
                cp.last_boot = now;
            })
            .or_insert_with(|| ChargePoint {
                serial_number: info.serial_number.clone(),
                vendor: info.vendor,
                model: info.model,
                firmware_version: info.firmware_version,
                iccid: info.iccid,
                imsi: info.imsi,
                meter_serial_number: info.meter_serial_number,
                meter_type: info.meter_type,
                last_boot: now,
                last_heartbeat: None,
            });
        Ok(())
    }

    async fn update_last_heartbeat(
        &self,
        serial_number: &str,
        current_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .charge_points
            .get_mut(serial_number)
            .ok_or_else(|| StoreError::UnknownChargepoint(serial_number.to_string()))?;
        entry.last_heartbeat = Some(current_time);
        Ok(())
    }

    async fn find(&self, serial_number: &str) -> Result<Option<ChargePoint>, StoreError> {
        Ok(self.charge_points.get(serial_number).map(|e| e.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boot_info(serial: &str) -> BootNotificationInfo {
        BootNotificationInfo {
            serial_number: serial.to_string(),
            vendor: "Myenergi".to_string(),
            model: "Zappi".to_string(),
            firmware_version: Some("5540".to_string()),
            iccid: None,
            imsi: None,
            meter_serial_number: None,
            meter_type: None,
        }
    }

    #[tokio::test]
    async fn add_chargepoint_then_find() {
        let store = InMemoryChargePointStore::new();
        store.add_chargepoint(boot_info("SN1")).await.unwrap();
        let cp = store.find("SN1").await.unwrap().unwrap();
        assert_eq!(cp.vendor, "Myenergi");
    }

    #[tokio::test]
    async fn update_heartbeat_on_unknown_chargepoint_fails() {
        let store = InMemoryChargePointStore::new();
        let err = store
            .update_last_heartbeat("ghost", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownChargepoint(_)));
    }

    #[tokio::test]
    async fn second_boot_notification_upserts_rather_than_duplicating() {
        let store = InMemoryChargePointStore::new();
        store.add_chargepoint(boot_info("SN1")).await.unwrap();
        let mut second = boot_info("SN1");
        second.firmware_version = Some("6000".to_string());
        store.add_chargepoint(second).await.unwrap();
        let cp = store.find("SN1").await.unwrap().unwrap();
        assert_eq!(cp.firmware_version.as_deref(), Some("6000"));
    }
}
