use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_rides::Ride;
use super::m20250301_000003_create_bookings::PaymentStatus;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentTransaction::Table)
                    .if_not_exists()
                    .col(uuid(PaymentTransaction::Id).primary_key())
                    .col(uuid(PaymentTransaction::UserId).not_null())
                    .col(uuid_null(PaymentTransaction::RideId))
                    .col(string_len(PaymentTransaction::PaymentId, 100).not_null())
                    .col(integer(PaymentTransaction::SeatsBooked).not_null())
                    .col(double(PaymentTransaction::Amount).not_null())
                    .col(string_len(PaymentTransaction::Currency, 3).default("INR"))
                    .col(
                        ColumnDef::new(PaymentTransaction::Status)
                            .custom(PaymentStatus::Enum)
                            .not_null(),
                    )
                    .col(double_null(PaymentTransaction::RefundAmount))
                    .col(timestamp_with_time_zone_null(PaymentTransaction::RefundedAt))
                    .col(
                        timestamp_with_time_zone(PaymentTransaction::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(PaymentTransaction::Amount).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transaction_user")
                            .from(PaymentTransaction::Table, PaymentTransaction::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // Keep the ledger when a ride is deleted
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transaction_ride")
                            .from(PaymentTransaction::Table, PaymentTransaction::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_transaction_user_created")
                    .table(PaymentTransaction::Table)
                    .col(PaymentTransaction::UserId)
                    .col(PaymentTransaction::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_transaction_payment_id")
                    .table(PaymentTransaction::Table)
                    .col(PaymentTransaction::PaymentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentTransaction::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PaymentTransaction {
    Table,
    Id,
    UserId,
    RideId,
    PaymentId,
    SeatsBooked,
    Amount,
    Currency,
    Status,
    RefundAmount,
    RefundedAt,
    CreatedAt,
}
