use axum::{
    routing::{get, post},
    Router,
};

use super::certificates::{
    certificates, export_certificates, generate_certificate, issue_certificate, revoke_certificate,
};
use super::evaluations::{
    create_template, distribute_template, edit_template, evaluation_result, export_results,
    new_template, remind_template, send_to_kaprodi, templates, toggle_template, tracking,
    update_template,
};
use super::handlers::admin_dashboard;
use super::reports::{
    activate_deadline, approve_final_report, create_deadline, deactivate_deadline, deadlines,
    final_reports, progress_reports, update_deadline, weekly_reports,
};
use crate::app_state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_dashboard))
        .route("/templates", get(templates).post(create_template))
        .route("/templates/new", get(new_template))
        .route("/templates/send-kaprodi", post(send_to_kaprodi))
        .route("/templates/export.csv", get(export_results))
        .route("/templates/{id}", post(update_template))
        .route("/templates/{id}/edit", get(edit_template))
        .route("/templates/{id}/toggle", post(toggle_template))
        .route("/templates/{id}/distribute", post(distribute_template))
        .route("/templates/{id}/remind", post(remind_template))
        .route("/tracking", get(tracking))
        .route(
            "/evaluations/{confirmation_id}/{template_id}",
            get(evaluation_result),
        )
        .route("/progress-reports", get(progress_reports))
        .route("/final-reports", get(final_reports))
        .route("/final-reports/{id}/approve", post(approve_final_report))
        .route("/weekly-reports", get(weekly_reports))
        .route("/deadlines", get(deadlines).post(create_deadline))
        .route("/deadlines/{id}", post(update_deadline))
        .route("/deadlines/{id}/activate", post(activate_deadline))
        .route("/deadlines/{id}/deactivate", post(deactivate_deadline))
        .route("/certificates", get(certificates))
        .route("/certificates/generate", post(generate_certificate))
        .route("/certificates/export.csv", get(export_certificates))
        .route("/certificates/{id}/revoke", post(revoke_certificate))
        .route("/certificates/{id}/issue", post(issue_certificate))
}
