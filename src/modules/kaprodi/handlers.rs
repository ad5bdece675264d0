use askama::Template;
use axum::{extract::State, response::{IntoResponse, Response}};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::DepartmentHeadUser;
use crate::db::models::{ConfirmationStatus, EvaluationRecord, EvaluationStatus, FlashLevel};
use crate::db::repositories::{
    ConfirmationRepository, DepartmentHeadRepository, EvaluationRecordRepository,
    StudentProfileRepository,
};
use crate::error::AppResult;
use crate::modules::common::{label, HtmlTemplate, Page};

pub struct ProgramCount {
    pub code: &'static str,
    pub label: String,
    pub count: usize,
}

pub struct ProgramStudentRow {
    pub student_name: String,
    pub student_number: String,
    pub cohort_year: i32,
    pub completion: u8,
    pub company_name: String,
    pub period: String,
    pub status: String,
    pub status_code: &'static str,
    pub evaluations_answered: usize,
    pub evaluations_total: usize,
}

#[derive(Template)]
#[template(path = "kaprodi/dashboard.html")]
struct DashboardTemplate {
    page: Page,
    study_program: String,
    counts: Vec<ProgramCount>,
    total_students: usize,
    rows: Vec<ProgramStudentRow>,
}

/// `(answered, total)` evaluation records for one placement.
pub fn evaluation_progress(records: &[EvaluationRecord], confirmation_id: Uuid) -> (usize, usize) {
    records
        .iter()
        .filter(|r| r.confirmation_id == confirmation_id)
        .fold((0, 0), |(answered, total), r| {
            let done = usize::from(r.status != EvaluationStatus::Pending);
            (answered + done, total + 1)
        })
}

/// Placements and evaluation progress for the head's own study program.
pub async fn kaprodi_dashboard(
    State(state): State<AppState>,
    head: DepartmentHeadUser,
) -> AppResult<Response> {
    let department = DepartmentHeadRepository::find_by_user(&state.db, head.user.id).await?;
    let Some(department) = department else {
        tracing::warn!(user_id = %head.user.id, "Department head without a program record");
        let page = Page::for_user(&state, &head, "title-kaprodi-dashboard")
            .await
            .notice_key(FlashLevel::Error, "error-program-missing");
        return Ok(HtmlTemplate(DashboardTemplate {
            page,
            study_program: String::new(),
            counts: Vec::new(),
            total_students: 0,
            rows: Vec::new(),
        })
        .into_response());
    };
    let program = department.study_program;

    let students = StudentProfileRepository::list_by_program(&state.db, &program).await?;
    let confirmations = ConfirmationRepository::list_by_program(&state.db, &program).await?;
    let ids: Vec<Uuid> = confirmations.iter().map(|c| c.confirmation.id).collect();
    let records = EvaluationRecordRepository::list_for_confirmations(&state.db, &ids).await?;

    let page = Page::for_user(&state, &head, "title-kaprodi-dashboard").await;
    let counts = ConfirmationStatus::all()
        .into_iter()
        .map(|status| ProgramCount {
            code: status.as_str(),
            label: label(&page.t, "confirmation-status", status.as_str()),
            count: confirmations
                .iter()
                .filter(|c| c.confirmation.status == status)
                .count(),
        })
        .collect();

    let rows = students
        .iter()
        .map(|student| {
            let placement = confirmations
                .iter()
                .map(|c| &c.confirmation)
                .find(|c| c.student_id == student.user_id);
            let (answered, total) = placement
                .map(|c| evaluation_progress(&records, c.id))
                .unwrap_or((0, 0));
            ProgramStudentRow {
                student_name: student.full_name.clone(),
                student_number: student.student_number.clone(),
                cohort_year: student.cohort_year,
                completion: student.completion_percentage(),
                company_name: placement.map(|c| c.company_name.clone()).unwrap_or_default(),
                period: placement.map(|c| c.period_label()).unwrap_or_default(),
                status: placement
                    .map(|c| label(&page.t, "confirmation-status", c.status.as_str()))
                    .unwrap_or_else(|| page.t.get("confirmation-none")),
                status_code: placement.map(|c| c.status.as_str()).unwrap_or("none"),
                evaluations_answered: answered,
                evaluations_total: total,
            }
        })
        .collect();

    Ok(HtmlTemplate(DashboardTemplate {
        page,
        study_program: program,
        counts,
        total_students: students.len(),
        rows,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use std::collections::BTreeMap;
    use time::OffsetDateTime;

    fn record(confirmation_id: Uuid, status: EvaluationStatus) -> EvaluationRecord {
        let now = OffsetDateTime::now_utc();
        EvaluationRecord {
            id: Uuid::new_v4(),
            confirmation_id,
            template_id: Uuid::new_v4(),
            answers: Json(BTreeMap::new()),
            status,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counts_answered_records_per_placement() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let records = vec![
            record(mine, EvaluationStatus::Pending),
            record(mine, EvaluationStatus::Completed),
            record(mine, EvaluationStatus::Finished),
            record(other, EvaluationStatus::Completed),
        ];
        assert_eq!(evaluation_progress(&records, mine), (2, 3));
        assert_eq!(evaluation_progress(&records, Uuid::new_v4()), (0, 0));
    }
}
