//! Supervisor accounts created on the fly from a student's confirmation.

use sqlx::{Postgres, Transaction};
use time::Duration;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::{generate_token, hash_token};
use crate::db::models::{NewConfirmation, NewUser, User, UserRole};
use crate::db::repositories::{
    PasswordResetRepository, SupervisorProfileRepository, UserRepository,
};
use crate::error::AppResult;
use crate::mail::{self, messages, messages::PlacementSummary};

const RESET_TOKEN_LENGTH: usize = 48;
const RESET_TOKEN_TTL_HOURS: i64 = 72;

/// The outcome of matching a confirmation's supervisor email to an account.
#[derive(Debug, Clone)]
pub struct SupervisorLink {
    pub user_id: Option<Uuid>,
    /// Set when a new account was created and still needs its welcome mail.
    pub invited: Option<User>,
}

/// Finds or creates the supervisor named on the form inside `tx`.
pub async fn link_supervisor(
    state: &AppState,
    tx: &mut Transaction<'_, Postgres>,
    form: &NewConfirmation,
) -> AppResult<SupervisorLink> {
    let email = form.supervisor_email.trim().to_lowercase();

    if let Some(user) = UserRepository::get_user_by_email(&state.db, &email).await? {
        if user.role != UserRole::Supervisor {
            tracing::warn!(
                user_id = %user.id,
                role = user.role.as_str(),
                "Supervisor email belongs to a non-supervisor account"
            );
            return Ok(SupervisorLink {
                user_id: None,
                invited: None,
            });
        }

        match SupervisorProfileRepository::find_by_user(&state.db, user.id).await? {
            Some(_) => {
                SupervisorProfileRepository::fill_missing_details(
                    tx,
                    user.id,
                    &form.supervisor_phone,
                    &form.company_name,
                    &form.business_field,
                )
                .await?;
            }
            None => {
                SupervisorProfileRepository::create(
                    tx,
                    &user,
                    &form.supervisor_phone,
                    &form.company_name,
                    &form.business_field,
                    false,
                )
                .await?;
            }
        }
        return Ok(SupervisorLink {
            user_id: Some(user.id),
            invited: None,
        });
    }

    let user = UserRepository::create_user(
        tx,
        &NewUser {
            email,
            password_hash: None,
            full_name: form.supervisor_name.trim().to_string(),
            role: UserRole::Supervisor,
            must_change_password: true,
        },
    )
    .await?;
    SupervisorProfileRepository::create(
        tx,
        &user,
        &form.supervisor_phone,
        &form.company_name,
        &form.business_field,
        true,
    )
    .await?;

    tracing::info!(user_id = %user.id, "Supervisor account created from confirmation");
    Ok(SupervisorLink {
        user_id: Some(user.id),
        invited: Some(user),
    })
}

pub fn reset_url(base: &str, token: &str) -> String {
    format!("{}/accounts/password/reset/{}", base.trim_end_matches('/'), token)
}

/// Issues a reset token and mails the welcome message. Failures are logged only.
pub async fn send_invitation(state: &AppState, user: &User, placement: &PlacementSummary) {
    let token = generate_token(RESET_TOKEN_LENGTH);
    if let Err(e) = PasswordResetRepository::create(
        &state.db,
        user.id,
        &hash_token(&token),
        Duration::hours(RESET_TOKEN_TTL_HOURS),
    )
    .await
    {
        tracing::error!(user_id = %user.id, error = %e, "Failed to store password reset token");
        return;
    }

    let url = reset_url(&state.env.app.public_base_url, &token);
    let email = match messages::supervisor_welcome(
        &user.full_name,
        &user.email,
        &url,
        placement,
        state.env.app.kaprodi_email.as_deref(),
    ) {
        Ok(email) => email,
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to build welcome email");
            return;
        }
    };
    mail::deliver(state.mailer.as_ref(), &email).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_url_joins_without_double_slash() {
        assert_eq!(
            reset_url("https://coop.univ.test/", "abc"),
            "https://coop.univ.test/accounts/password/reset/abc"
        );
        assert_eq!(
            reset_url("http://localhost:8000", "abc"),
            "http://localhost:8000/accounts/password/reset/abc"
        );
    }
}
