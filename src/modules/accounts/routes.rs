use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_department_head, create_supervisor, department_heads, force_password,
    force_password_form, login, login_form, logout, register, register_form, reset_password,
    reset_password_form, supervisors,
};
use crate::app_state::AppState;

pub fn accounts_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout))
        .route("/register", get(register_form).post(register))
        .route("/password/force", get(force_password_form).post(force_password))
        .route(
            "/password/reset/{token}",
            get(reset_password_form).post(reset_password),
        )
        .route("/supervisors", get(supervisors).post(create_supervisor))
        .route(
            "/department-heads",
            get(department_heads).post(create_department_head),
        )
}
