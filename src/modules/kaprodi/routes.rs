use axum::{routing::get, Router};

use super::handlers::kaprodi_dashboard;
use crate::app_state::AppState;

pub fn kaprodi_routes() -> Router<AppState> {
    Router::new().route("/", get(kaprodi_dashboard))
}
