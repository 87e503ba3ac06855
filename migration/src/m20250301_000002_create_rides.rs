use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(RideStatus::Enum)
                    .values([
                        RideStatus::Active,
                        RideStatus::Full,
                        RideStatus::Started,
                        RideStatus::Completed,
                        RideStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(uuid(Ride::Id).primary_key())
                    .col(string_len(Ride::FromLabel, 200).not_null())
                    .col(string_len(Ride::ToLabel, 200).not_null())
                    .col(double_null(Ride::FromLat))
                    .col(double_null(Ride::FromLng))
                    .col(double_null(Ride::ToLat))
                    .col(double_null(Ride::ToLng))
                    .col(double_null(Ride::DistanceKm))
                    .col(date(Ride::DepartureDate).not_null())
                    .col(time(Ride::DepartureTime).not_null())
                    .col(integer(Ride::Seats).not_null())
                    .col(integer(Ride::AvailableSeats).not_null())
                    .col(double(Ride::Price).not_null())
                    .col(text_null(Ride::Notes))
                    .col(uuid(Ride::DriverUserId).not_null())
                    .col(string_len(Ride::DriverName, 100).not_null())
                    .col(string_len(Ride::DriverPhone, 20).not_null())
                    .col(double(Ride::DriverRating).not_null().default(5.0))
                    .col(
                        ColumnDef::new(Ride::Status)
                            .custom(RideStatus::Enum)
                            .not_null(),
                    )
                    .col(integer(Ride::Version).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Ride::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Seat inventory can never go negative or exceed capacity
                    .check(Expr::col(Ride::AvailableSeats).gte(0))
                    .check(Expr::col(Ride::AvailableSeats).lte(Expr::col(Ride::Seats)))
                    .check(Expr::col(Ride::Price).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_driver")
                            .from(Ride::Table, Ride::DriverUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_driver")
                    .table(Ride::Table)
                    .col(Ride::DriverUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_date_status")
                    .table(Ride::Table)
                    .col(Ride::DepartureDate)
                    .col(Ride::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(RideStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    Id,
    FromLabel,
    ToLabel,
    FromLat,
    FromLng,
    ToLat,
    ToLng,
    DistanceKm,
    DepartureDate,
    DepartureTime,
    Seats,
    AvailableSeats,
    Price,
    Notes,
    DriverUserId,
    DriverName,
    DriverPhone,
    DriverRating,
    Status,
    Version,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum RideStatus {
    #[sea_orm(iden = "ride_status")]
    Enum,
    #[sea_orm(iden = "active")]
    Active,
    #[sea_orm(iden = "full")]
    Full,
    #[sea_orm(iden = "started")]
    Started,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
