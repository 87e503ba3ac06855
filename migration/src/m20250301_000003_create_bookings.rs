use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(BookingStatus::Enum)
                    .values([
                        BookingStatus::Pending,
                        BookingStatus::Confirmed,
                        BookingStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(PaymentStatus::Enum)
                    .values([
                        PaymentStatus::Pending,
                        PaymentStatus::Completed,
                        PaymentStatus::Failed,
                        PaymentStatus::Refunded,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::RideId).not_null())
                    .col(uuid(Booking::UserId).not_null())
                    .col(integer(Booking::SeatsBooked).not_null())
                    .col(integer(Booking::Position).not_null())
                    .col(timestamp_with_time_zone(Booking::BookingDate).not_null())
                    .col(
                        ColumnDef::new(Booking::Status)
                            .custom(BookingStatus::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Booking::PaymentStatus)
                            .custom(PaymentStatus::Enum)
                            .not_null(),
                    )
                    .col(string_len_null(Booking::PaymentId, 100))
                    .check(Expr::col(Booking::SeatsBooked).gte(1))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_ride")
                            .from(Booking::Table, Booking::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One passenger entry per user per ride
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_ride_user")
                    .table(Booking::Table)
                    .col(Booking::RideId)
                    .col(Booking::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_user")
                    .table(Booking::Table)
                    .col(Booking::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(PaymentStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(BookingStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    RideId,
    UserId,
    SeatsBooked,
    Position,
    BookingDate,
    Status,
    PaymentStatus,
    PaymentId,
}

#[derive(DeriveIden)]
pub enum BookingStatus {
    #[sea_orm(iden = "booking_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "confirmed")]
    Confirmed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}

#[derive(DeriveIden)]
pub enum PaymentStatus {
    #[sea_orm(iden = "payment_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "refunded")]
    Refunded,
}
