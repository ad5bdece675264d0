use axum::{routing::get, Router};

use super::handlers::{
    certificate, confirmation_form, dashboard, profile, submit_confirmation, update_profile,
};
use super::reports::{
    final_report_form, progress_report_form, progress_reports, save_final_report,
    save_progress_report, save_weekly_report, weekly_report_form, weekly_reports,
};
use crate::app_state::AppState;

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/profile", get(profile).post(update_profile))
        .route("/confirmation", get(confirmation_form).post(submit_confirmation))
        .route("/progress-reports", get(progress_reports))
        .route(
            "/progress-report",
            get(progress_report_form).post(save_progress_report),
        )
        .route("/final-report", get(final_report_form).post(save_final_report))
        .route("/weekly-reports", get(weekly_reports))
        .route("/weekly-report", get(weekly_report_form).post(save_weekly_report))
        .route("/certificate", get(certificate))
}
