mod ws_handler;

use axum::{routing::get, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::Notification;

pub use ws_handler::ws_handler;

/// A freshly stored notification on its way to the owner's sockets.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    #[serde(skip)]
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub notification: Notification,
}

impl NotificationEvent {
    pub fn new(notification: Notification) -> Self {
        Self {
            user_id: notification.user_id,
            kind: "notification",
            notification,
        }
    }

    pub fn is_for(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

pub fn websocket_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
