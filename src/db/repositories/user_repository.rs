use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{NewUser, User, UserRole};
use crate::db::DbResult;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, must_change_password, \
                            is_active, created_at, updated_at, last_login_at";

pub struct UserRepository;

impl UserRepository {
    pub async fn create_user(
        tx: &mut Transaction<'_, Postgres>,
        new_user: &NewUser,
    ) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role, must_change_password)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(new_user.email.trim().to_lowercase())
        .bind(&new_user.password_hash)
        .bind(new_user.full_name.trim())
        .bind(new_user.role)
        .bind(new_user.must_change_password)
        .fetch_one(&mut **tx)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user_by_email(pool: &PgPool, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email.trim().to_lowercase())
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    pub async fn list_by_role(pool: &PgPool, role: UserRole) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY full_name"
        ))
        .bind(role)
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    /// Stores a new hash and clears the forced-change flag.
    pub async fn set_password(pool: &PgPool, user_id: Uuid, password_hash: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, must_change_password = FALSE, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn record_login(pool: &PgPool, user_id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
