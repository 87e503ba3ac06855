use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(uuid(ChatMessage::Id).primary_key())
                    .col(uuid(ChatMessage::RideId).not_null())
                    .col(uuid(ChatMessage::UserId).not_null())
                    .col(string_len(ChatMessage::UserName, 100).not_null())
                    .col(text(ChatMessage::Message).not_null())
                    .col(
                        timestamp_with_time_zone(ChatMessage::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_ride")
                            .from(ChatMessage::Table, ChatMessage::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_user")
                            .from(ChatMessage::Table, ChatMessage::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ChatMessage {
    Table,
    Id,
    RideId,
    UserId,
    UserName,
    Message,
    CreatedAt,
}
