use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, DeleteMany, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::entities::notification::{self, NotificationStatus};
use crate::notify::{NewNotification, NotificationSink, NotifyError};
use crate::utils::paging::page_offset;

/// Read notifications older than this are removed by the background sweep.
pub const READ_RETENTION_DAYS: i64 = 30;

/// Persists notifications to the `notification` table.
#[derive(Clone)]
pub struct DbNotificationSink {
    db: DatabaseConnection,
}

impl DbNotificationSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationSink for DbNotificationSink {
    async fn create_notification(&self, n: &NewNotification) -> Result<(), NotifyError> {
        notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(n.user_id),
            kind: Set(n.kind),
            title: Set(n.title.clone()),
            message: Set(n.message.clone()),
            status: Set(NotificationStatus::Unread),
            priority: Set(n.priority),
            metadata: Set(n.metadata.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }
}

pub struct NotificationPage {
    pub items: Vec<notification::Model>,
    pub total: u64,
    pub unread: u64,
}

/// Newest first. `page` is 1-based.
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    page: u64,
    limit: u64,
) -> Result<NotificationPage, DbErr> {
    let base = notification::Entity::find().filter(notification::Column::UserId.eq(user_id));

    let total = base.clone().count(db).await?;
    let unread = unread_for(user_id).count(db).await?;

    let items = base
        .order_by_desc(notification::Column::CreatedAt)
        .offset(page_offset(page, limit))
        .limit(limit)
        .all(db)
        .await?;

    Ok(NotificationPage { items, total, unread })
}

fn unread_for(user_id: Uuid) -> Select<notification::Entity> {
    notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Status.eq(NotificationStatus::Unread))
}

fn owned_by(user_id: Uuid, id: Uuid) -> DeleteMany<notification::Entity> {
    notification::Entity::delete_many()
        .filter(notification::Column::Id.eq(id))
        .filter(notification::Column::UserId.eq(user_id))
}

pub async fn unread_count(db: &DatabaseConnection, user_id: Uuid) -> Result<u64, DbErr> {
    unread_for(user_id).count(db).await
}

/// Returns false when the notification does not exist or belongs to someone else.
pub async fn delete_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    id: Uuid,
) -> Result<bool, DbErr> {
    let result = owned_by(user_id, id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Returns false when the notification does not exist or belongs to someone else.
pub async fn mark_read(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<bool, DbErr> {
    let result = notification::Entity::update_many()
        .set(notification::ActiveModel {
            status: Set(NotificationStatus::Read),
            ..Default::default()
        })
        .filter(notification::Column::Id.eq(id))
        .filter(notification::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn mark_all_read(db: &DatabaseConnection, user_id: Uuid) -> Result<u64, DbErr> {
    let result = notification::Entity::update_many()
        .set(notification::ActiveModel {
            status: Set(NotificationStatus::Read),
            ..Default::default()
        })
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Status.eq(NotificationStatus::Unread))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete_read_before(
    db: &DatabaseConnection,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let result = notification::Entity::delete_many()
        .filter(notification::Column::Status.eq(NotificationStatus::Read))
        .filter(notification::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn cleanup_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64, DbErr> {
    delete_read_before(db, now - Duration::days(READ_RETENTION_DAYS)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_unread_query_is_scoped_to_user() {
        let user_id = Uuid::new_v4();
        let sql = unread_for(user_id).build(DbBackend::Postgres).to_string();

        assert!(sql.contains(r#""notification"."user_id" = "#));
        assert!(sql.contains(&user_id.to_string()));
        assert!(sql.contains(r#""notification"."status" = 'unread'"#));
    }

    #[test]
    fn test_delete_requires_owner() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();
        let sql = owned_by(user_id, id).build(DbBackend::Postgres).to_string();

        assert!(sql.starts_with(r#"DELETE FROM "notification""#));
        assert!(sql.contains(&id.to_string()));
        assert!(sql.contains(&user_id.to_string()));
    }
}
