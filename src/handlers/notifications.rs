use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::notification;
use crate::error::{AppError, AppResult};
use crate::notify::db as notification_db;
use crate::utils::jwt::Claims;
use crate::AppState;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<notification::Model>,
    pub total: u64,
    pub unread_count: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// List the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<NotificationListResponse>> {
    let page = pagination.page.unwrap_or(1).max(1);
    let limit = pagination.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let result = notification_db::list_for_user(&state.db, claims.sub, page, limit).await?;

    Ok(Json(NotificationListResponse {
        notifications: result.items,
        total: result.total,
        unread_count: result.unread,
        page,
        limit,
    }))
}

/// Mark one notification read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if !notification_db::mark_read(&state.db, claims.sub, notification_id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Mark every unread notification read
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = notification_db::mark_all_read(&state.db, claims.sub).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

/// Unread badge count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread_count = notification_db::unread_count(&state.db, claims.sub).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// Delete one of the caller's notifications
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if !notification_db::delete_for_user(&state.db, claims.sub, notification_id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
