//! SeaORM-backed `ChargePointStore`, grounded in
//! `infrastructure/database/repositories/charge_point_repository.rs`
//! (connection handle + `ActiveModel` upsert pattern), narrowed to the
//! `charge_points` table this service owns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait};
use tracing::debug;

use super::entity::{self, Entity as ChargePointEntity};
use super::traits::{BootNotificationInfo, ChargePoint, ChargePointStore, StoreError};

pub struct SeaOrmChargePointStore {
    db: DatabaseConnection,
}

impl SeaOrmChargePointStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn model_to_charge_point(m: entity::Model) -> ChargePoint {
    ChargePoint {
        serial_number: m.serial_number,
        vendor: m.vendor,
        model: m.model,
        firmware_version: m.firmware_version,
        iccid: m.iccid,
        imsi: m.imsi,
        meter_serial_number: m.meter_serial_number,
        meter_type: m.meter_type,
        last_boot: m.last_boot,
        last_heartbeat: m.last_heartbeat,
    }
}

#[async_trait]
impl ChargePointStore for SeaOrmChargePointStore {
    async fn add_chargepoint(&self, info: BootNotificationInfo) -> Result<(), StoreError> {
        let now = Utc::now();
        let existing = ChargePointEntity::find_by_id(info.serial_number.clone())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let active = entity::ActiveModel {
            serial_number: Set(info.serial_number.clone()),
            vendor: Set(info.vendor),
            model: Set(info.model),
            firmware_version: Set(info.firmware_version),
            iccid: Set(info.iccid),
            imsi: Set(info.imsi),
            meter_serial_number: Set(info.meter_serial_number),
            meter_type: Set(info.meter_type),
            last_boot: Set(now),
            last_heartbeat: Set(existing.as_ref().and_then(|e| e.last_heartbeat)),
        };

        if existing.is_some() {
            active.update(&self.db).await.map_err(db_err)?;
            debug!(serial_number = %info.serial_number, "charge point updated");
        } else {
            active.insert(&self.db).await.map_err(db_err)?;
            debug!(serial_number = %info.serial_number, "charge point registered");
        }
        Ok(())
    }

    async fn update_last_heartbeat(
        &self,
        serial_number: &str,
        current_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let existing = ChargePointEntity::find_by_id(serial_number.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::UnknownChargepoint(serial_number.to_string()))?;

        let mut active: entity::ActiveModel = existing.into();
        active.last_heartbeat = Set(Some(current_time));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, serial_number: &str) -> Result<Option<ChargePoint>, StoreError> {
        ChargePointEntity::find_by_id(serial_number.to_string())
            .one(&self.db)
            .await
            .map(|opt| opt.map(model_to_charge_point))
            .map_err(db_err)
    }
}
