use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use cookie::{Cookie, SameSite};

use crate::app_state::AppState;
use crate::auth::password::generate_token;
use crate::db::models::{FlashLevel, FlashMessage, User};
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "coop_session";
pub const LANGUAGE_COOKIE: &str = "lang";
const SESSION_TOKEN_LENGTH: usize = 48;

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(token: &str, ttl_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::hours(ttl_hours))
        .build()
}

pub fn language_cookie(code: &str) -> Cookie<'static> {
    Cookie::build((LANGUAGE_COOKIE, code.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::days(365))
        .build()
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}

pub fn with_cookie(mut response: Response, cookie: Cookie<'_>) -> Response {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, name = cookie.name(), "Invalid cookie value"),
    }
    response
}

/// Opens a session for `user` and returns the cookie to set.
pub async fn start_session(
    state: &AppState,
    user: &User,
    flash: &[FlashMessage],
) -> Result<Cookie<'static>, AppError> {
    let token = generate_token(SESSION_TOKEN_LENGTH);
    let ttl = time::Duration::hours(state.env.app.session_ttl_hours);
    SessionRepository::create(&state.db, &token, user.id, ttl, flash).await?;
    UserRepository::record_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Session started");
    Ok(session_cookie(
        &token,
        state.env.app.session_ttl_hours,
        state.env.is_production(),
    ))
}

/// Queues a message for the next rendered page. Failures are logged only.
pub async fn push_flash(
    state: &AppState,
    session_id: &str,
    level: FlashLevel,
    message: impl Into<String>,
) {
    let message = FlashMessage::new(level, message);
    if let Err(e) = SessionRepository::push_flash(&state.db, session_id, &message).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

pub async fn take_flash(state: &AppState, session_id: &str) -> Vec<FlashMessage> {
    match SessionRepository::take_flash(&state.db, session_id).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("lang=en; coop_session=abc123; theme=dark"),
        );
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(read_cookie(&headers, LANGUAGE_COOKIE).as_deref(), Some("en"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("coop_session="));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let rendered = session_cookie("tok", 12, true).to_string();
        assert!(rendered.starts_with("coop_session=tok"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=43200"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let rendered = removal_cookie(SESSION_COOKIE).to_string();
        assert!(rendered.contains("Max-Age=0"));
    }
}
