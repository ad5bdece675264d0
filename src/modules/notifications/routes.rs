use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{list_notifications, mark_all_notifications_read, mark_notification_read};
use crate::app_state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_notifications_read))
        .route("/{id}/read", post(mark_notification_read))
}
