//! The one migration this service owns, grounded in
//! `infrastructure/database/migrator/m20240101_000001_create_charge_points.rs`
//! and trimmed to the SPEC_FULL.md §3 Charge Point fields.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct CreateChargePoints;

#[async_trait::async_trait]
impl MigrationTrait for CreateChargePoints {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargePoints::SerialNumber)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargePoints::Vendor).string().not_null())
                    .col(ColumnDef::new(ChargePoints::Model).string().not_null())
                    .col(ColumnDef::new(ChargePoints::FirmwareVersion).string())
                    .col(ColumnDef::new(ChargePoints::Iccid).string())
                    .col(ColumnDef::new(ChargePoints::Imsi).string())
                    .col(ColumnDef::new(ChargePoints::MeterSerialNumber).string())
                    .col(ColumnDef::new(ChargePoints::MeterType).string())
                    .col(
                        ColumnDef::new(ChargePoints::LastBoot)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargePoints::LastHeartbeat).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargePoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChargePoints {
    Table,
    SerialNumber,
    Vendor,
    Model,
    FirmwareVersion,
    Iccid,
    Imsi,
    MeterSerialNumber,
    MeterType,
    LastBoot,
    LastHeartbeat,
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateChargePoints)]
    }
}
