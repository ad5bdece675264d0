use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config;
use crate::db::models::Notification;
use crate::i18n::Localizer;
use crate::mail::Mailer;
use crate::storage::FileStorage;
use crate::websocket::NotificationEvent;

const WS_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub ws_tx: broadcast::Sender<NotificationEvent>,
    pub localizer: Arc<Localizer>,
    pub storage: Arc<dyn FileStorage>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        env: config::Config,
        localizer: Arc<Localizer>,
        storage: Arc<dyn FileStorage>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let (ws_tx, _) = broadcast::channel(WS_CHANNEL_CAPACITY);
        Self {
            db,
            env,
            ws_tx,
            localizer,
            storage,
            mailer,
        }
    }

    /// Pushes a stored notification to any open socket of its owner.
    pub fn publish(&self, notification: Notification) {
        let user_id = notification.user_id;
        // A send error only means nobody is connected right now.
        if self.ws_tx.send(NotificationEvent::new(notification)).is_err() {
            tracing::trace!(%user_id, "No websocket listeners for notification");
        }
    }
}
