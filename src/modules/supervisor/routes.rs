use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    complete, dashboard, evaluate_form, reports, review, review_progress_report, submit_evaluation,
};
use crate::app_state::AppState;

pub fn supervisor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/confirmations/{id}/review", post(review))
        .route("/confirmations/{id}/complete", post(complete))
        .route(
            "/confirmations/{id}/evaluate",
            get(evaluate_form).post(submit_evaluation),
        )
        .route("/confirmations/{id}/reports", get(reports))
        .route("/progress-reports/{id}/review", post(review_progress_report))
}
