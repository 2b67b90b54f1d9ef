//! SeaORM entity for the single `charge_points` table this service owns.
//! Trimmed from `infrastructure/database/entities/charge_point.rs`
//! to the fields SPEC_FULL.md §3's Charge Point data model names.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "charge_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub serial_number: String,

    pub vendor: String,
    pub model: String,

    #[sea_orm(nullable)]
    pub firmware_version: Option<String>,
    #[sea_orm(nullable)]
    pub iccid: Option<String>,
    #[sea_orm(nullable)]
    pub imsi: Option<String>,
    #[sea_orm(nullable)]
    pub meter_serial_number: Option<String>,
    #[sea_orm(nullable)]
    pub meter_type: Option<String>,

    pub last_boot: DateTimeUtc,
    #[sea_orm(nullable)]
    pub last_heartbeat: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
