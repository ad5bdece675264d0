use sqlx::types::Json;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::db::models::{FlashMessage, PasswordResetToken, Session};
use crate::db::DbResult;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &PgPool,
        token: &str,
        user_id: Uuid,
        ttl: Duration,
        flash: &[FlashMessage],
    ) -> DbResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, flash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, flash, created_at, expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(Json(flash))
        .bind(OffsetDateTime::now_utc() + ttl)
        .fetch_one(pool)
        .await?;
        Ok(session)
    }

    pub async fn find_active(pool: &PgPool, token: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, flash, created_at, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;
        Ok(session)
    }

    pub async fn push_flash(pool: &PgPool, token: &str, message: &FlashMessage) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET flash = flash || $1 WHERE id = $2")
            .bind(Json(vec![message]))
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Returns and clears the pending flash messages.
    pub async fn take_flash(pool: &PgPool, token: &str) -> DbResult<Vec<FlashMessage>> {
        let flash: Option<Json<Vec<FlashMessage>>> = sqlx::query_scalar(
            r#"
            UPDATE sessions AS s
            SET flash = '[]'::jsonb
            FROM (SELECT id, flash AS pending FROM sessions WHERE id = $1) AS old
            WHERE s.id = old.id
            RETURNING old.pending
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;
        Ok(flash.map(|f| f.0).unwrap_or_default())
    }

    pub async fn delete(pool: &PgPool, token: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete_expired(pool: &PgPool) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub struct PasswordResetRepository;

impl PasswordResetRepository {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        ttl: Duration,
    ) -> DbResult<PasswordResetToken> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, created_at, expires_at, used_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(token_hash)
        .bind(OffsetDateTime::now_utc() + ttl)
        .fetch_one(pool)
        .await?;
        Ok(token)
    }

    pub async fn find_by_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> DbResult<Option<PasswordResetToken>> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT id, user_id, token_hash, created_at, expires_at, used_at
            FROM password_reset_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;
        Ok(token)
    }

    pub async fn mark_used(pool: &PgPool, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
