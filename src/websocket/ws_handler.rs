use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::NotificationEvent;
use crate::app_state::AppState;
use crate::auth::SessionUser;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    session: SessionUser,
) -> impl IntoResponse {
    let user_id = session.user.id;
    let rx = state.ws_tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, user_id))
}

async fn handle_socket(
    socket: WebSocket,
    mut rx: broadcast::Receiver<NotificationEvent>,
    user_id: Uuid,
) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(%user_id, "Notification socket opened");

    // Clients only listen; incoming frames are drained until close.
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%user_id, skipped, "Notification socket lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if !event.is_for(user_id) {
                continue;
            }
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode notification");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = recv_task => {},
        _ = send_task => {},
    }
    tracing::debug!(%user_id, "Notification socket closed");
}
