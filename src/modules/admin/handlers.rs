use askama::Template;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::models::ConfirmationStatus;
use crate::db::repositories::{ConfirmationRepository, StudentProfileRepository};
use crate::error::AppResult;
use crate::modules::common::{label, HtmlTemplate, Page};

pub struct StatusCount {
    pub code: &'static str,
    pub label: String,
    pub count: i64,
}

pub struct PlacementRow {
    pub id: String,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub company_name: String,
    pub position: String,
    pub supervisor_name: String,
    pub supervisor_email: String,
    pub supervisor_linked: bool,
    pub period: String,
    pub status: String,
    pub status_code: &'static str,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    page: Page,
    counts: Vec<StatusCount>,
    total_students: usize,
    without_confirmation: usize,
    filter: String,
    rows: Vec<PlacementRow>,
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub status: Option<String>,
}

/// Internship status across every student.
pub async fn admin_dashboard(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<OverviewQuery>,
) -> AppResult<impl IntoResponse> {
    let counts = ConfirmationRepository::count_by_status(&state.db).await?;
    let confirmations = ConfirmationRepository::list_all(&state.db).await?;
    let students = StudentProfileRepository::list_all(&state.db).await?;

    let filter = query.status.unwrap_or_default();
    let page = Page::for_user(&state, &admin, "title-admin-dashboard").await;
    let counts = ConfirmationStatus::all()
        .into_iter()
        .map(|status| StatusCount {
            code: status.as_str(),
            label: label(&page.t, "confirmation-status", status.as_str()),
            count: counts
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0),
        })
        .collect();
    let without_confirmation = students
        .iter()
        .filter(|s| !confirmations.iter().any(|c| c.confirmation.student_id == s.user_id))
        .count();

    let rows = confirmations
        .iter()
        .filter(|row| filter.is_empty() || row.confirmation.status.as_str() == filter)
        .map(|row| {
            let c = &row.confirmation;
            PlacementRow {
                id: c.id.to_string(),
                student_name: row.student_name.clone(),
                student_number: row.student_number.clone(),
                study_program: row.study_program.clone(),
                company_name: c.company_name.clone(),
                position: c.position.clone(),
                supervisor_name: c.supervisor_name.clone(),
                supervisor_email: c.supervisor_email.clone(),
                supervisor_linked: c.supervisor_user_id.is_some(),
                period: c.period_label(),
                status: label(&page.t, "confirmation-status", c.status.as_str()),
                status_code: c.status.as_str(),
            }
        })
        .collect();

    Ok(HtmlTemplate(DashboardTemplate {
        page,
        counts,
        total_students: students.len(),
        without_confirmation,
        filter,
        rows,
    }))
}
