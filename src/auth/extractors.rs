use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::ops::Deref;

use crate::app_state::AppState;
use crate::auth::session::{push_flash, read_cookie, SESSION_COOKIE};
use crate::db::models::{FlashLevel, User, UserRole};
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::i18n::SupportedLanguage;

pub const LOGIN_PATH: &str = "/accounts/login";
pub const FORCE_PASSWORD_PATH: &str = "/accounts/password/force";

#[derive(Debug)]
pub enum AuthRejection {
    /// No valid session; send to the login page.
    Login,
    /// Authenticated but must set a new password first.
    PasswordChange,
    /// Wrong role; back to the user's own dashboard.
    Forbidden(&'static str),
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Login => Redirect::to(LOGIN_PATH).into_response(),
            AuthRejection::PasswordChange => Redirect::to(FORCE_PASSWORD_PATH).into_response(),
            AuthRejection::Forbidden(home) => Redirect::to(home).into_response(),
            AuthRejection::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// A logged-in user, whether or not a password change is pending.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    pub session_id: String,
    pub language: SupportedLanguage,
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, SESSION_COOKIE).ok_or(AuthRejection::Login)?;

        let session = SessionRepository::find_active(&state.db, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Session lookup failed");
                AuthRejection::Internal
            })?
            .ok_or(AuthRejection::Login)?;

        let user = UserRepository::get_user_by_id(&state.db, session.user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "User lookup failed");
                AuthRejection::Internal
            })?
            .filter(|u| u.is_active)
            .ok_or(AuthRejection::Login)?;

        let language = parts
            .extensions
            .get::<SupportedLanguage>()
            .copied()
            .unwrap_or_default();

        Ok(SessionUser {
            user,
            session_id: session.id,
            language,
        })
    }
}

/// A logged-in user allowed past the forced password change.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

impl Deref for CurrentUser {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CurrentUser {
    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.user.role)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_user = SessionUser::from_request_parts(parts, state).await?;
        if session_user.user.must_change_password {
            return Err(AuthRejection::PasswordChange);
        }
        Ok(CurrentUser(session_user))
    }
}

/// Checks the role and, on mismatch, flashes a localized notice before redirecting.
pub async fn require_role(
    state: &AppState,
    current: &CurrentUser,
    roles: &[UserRole],
) -> Result<(), AuthRejection> {
    if current.has_role(roles) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %current.user.id,
        role = current.user.role.as_str(),
        "Role check failed"
    );
    let message = state
        .localizer
        .get_string_for_language(&current.language, "error-access-denied");
    push_flash(state, &current.session_id, FlashLevel::Error, message).await;
    Err(AuthRejection::Forbidden(current.user.role.dashboard_path()))
}

macro_rules! role_extractor {
    ($(#[$meta:meta])* $name:ident, [$($role:expr),+]) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub CurrentUser);

        impl Deref for $name {
            type Target = SessionUser;

            fn deref(&self) -> &Self::Target {
                &(self.0).0
            }
        }

        impl FromRequestParts<AppState> for $name {
            type Rejection = AuthRejection;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                let current = CurrentUser::from_request_parts(parts, state).await?;
                require_role(state, &current, &[$($role),+]).await?;
                Ok($name(current))
            }
        }
    };
}

role_extractor!(StudentUser, [UserRole::Student]);
role_extractor!(SupervisorUser, [UserRole::Supervisor]);
role_extractor!(AdminUser, [UserRole::Admin]);
role_extractor!(DepartmentHeadUser, [UserRole::DepartmentHead]);
role_extractor!(
    /// Admins and supervisors, who both manage job postings.
    StaffUser,
    [UserRole::Admin, UserRole::Supervisor]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_redirect_to_the_right_place() {
        let login = AuthRejection::Login.into_response();
        assert_eq!(login.status(), StatusCode::SEE_OTHER);
        assert_eq!(login.headers()["location"], LOGIN_PATH);

        let force = AuthRejection::PasswordChange.into_response();
        assert_eq!(force.headers()["location"], FORCE_PASSWORD_PATH);

        let forbidden = AuthRejection::Forbidden("/student").into_response();
        assert_eq!(forbidden.headers()["location"], "/student");
    }
}
