use axum::{routing::get, Router};

use super::handlers::{download_certificate, verify_certificate};
use crate::app_state::AppState;

pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route("/certificates/{id}/download", get(download_certificate))
        .route("/verify/{*number}", get(verify_certificate))
}
