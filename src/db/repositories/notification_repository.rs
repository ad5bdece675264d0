use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::models::{NewNotification, Notification};
use crate::db::DbResult;

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, kind, is_read, link, created_at";

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        notification: &NewNotification,
    ) -> DbResult<Notification> {
        let created = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, title, message, kind, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind)
        .bind(&notification.link)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn latest_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(notifications)
    }

    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Scoped to the owner so one user cannot touch another's inbox.
    pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
