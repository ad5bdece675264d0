use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::CurrentUser;
use crate::db::models::Notification;
use crate::db::repositories::NotificationRepository;
use crate::error::{AppError, AppResult};

const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated: u64,
}

/// Latest notifications for the bell menu plus the unread badge count
pub async fn list_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications =
        NotificationRepository::latest_for_user(&state.db, current.user.id, LATEST_LIMIT).await?;
    let unread_count = NotificationRepository::unread_count(&state.db, current.user.id).await?;

    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

/// Only the owner can mark a notification; anyone else gets a 404
pub async fn mark_notification_read(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    if !NotificationRepository::mark_read(&state.db, current.user.id, id).await? {
        return Err(AppError::NotFound("notification".into()));
    }
    Ok(Json(MarkReadResponse {
        success: true,
        updated: 1,
    }))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<MarkReadResponse>> {
    let updated = NotificationRepository::mark_all_read(&state.db, current.user.id).await?;
    tracing::debug!(user_id = %current.user.id, updated, "Notifications marked read");
    Ok(Json(MarkReadResponse {
        success: true,
        updated,
    }))
}
