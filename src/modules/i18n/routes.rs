use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use super::handlers::{
    get_current_language,
    get_supported_languages,
    get_translations,
    set_language,
};

/// Create i18n routes
pub fn create_i18n_routes() -> Router<AppState> {
    Router::new()
        .route("/languages", get(get_supported_languages))
        .route("/translations", get(get_translations))
        .route("/current-language", get(get_current_language))
        .route("/set-language", post(set_language))
}
