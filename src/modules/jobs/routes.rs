use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    apply_form, apply_to_job, create_job, delete_job, edit_job, job_applications, job_detail,
    list_jobs, manage_jobs, my_applications, new_job, update_application_status, update_job,
};
use crate::app_state::AppState;

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs))
        .route("/mine", get(my_applications))
        .route("/manage", get(manage_jobs))
        .route("/new", get(new_job).post(create_job))
        .route("/applications/{id}/status", post(update_application_status))
        .route("/{id}", get(job_detail))
        .route("/{id}/apply", get(apply_form).post(apply_to_job))
        .route("/{id}/edit", get(edit_job).post(update_job))
        .route("/{id}/delete", post(delete_job))
        .route("/{id}/applications", get(job_applications))
}
