use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::SupervisorUser;
use crate::db::models::{
    collect_answers, month_key, ConfirmationStatus, ConfirmationWithStudent, EvaluationRecord,
    EvaluationTemplate, FlashLevel, NewNotification, NotificationKind, SupervisorProfile,
};
use crate::db::repositories::{
    ConfirmationRepository, DepartmentHeadRepository, EvaluationRecordRepository,
    EvaluationTemplateRepository, FinalReportRepository, NotificationRepository,
    ProgressReportRepository, SupervisorProfileRepository,
};
use crate::error::AppResult;
use crate::i18n::I18n;
use crate::modules::common::{
    display_datetime, flash_redirect, label, publish_all, HtmlTemplate, Page,
};
use crate::workflow::{authorize_supervisor, plan_completion, plan_review, ReviewDecision};

const DASHBOARD: &str = "/supervisor";

/// Loads a confirmation the signed-in supervisor is assigned to.
async fn supervised(
    state: &AppState,
    supervisor: &SupervisorUser,
    id: Uuid,
) -> AppResult<Result<(SupervisorProfile, ConfirmationWithStudent), Response>> {
    let profile = SupervisorProfileRepository::get_or_create(&state.db, &supervisor.user).await?;
    let Some(row) = ConfirmationRepository::find_with_student(&state.db, id).await? else {
        return Ok(Err(flash_redirect(
            state,
            supervisor,
            FlashLevel::Error,
            "error-not-found",
            DASHBOARD,
        )
        .await));
    };
    if authorize_supervisor(&profile, &row.confirmation).is_err() {
        tracing::warn!(
            user_id = %supervisor.user.id,
            confirmation_id = %id,
            "Supervisor opened a confirmation assigned to someone else"
        );
        return Ok(Err(flash_redirect(
            state,
            supervisor,
            FlashLevel::Error,
            "error-access-denied",
            DASHBOARD,
        )
        .await));
    }
    Ok(Ok((profile, row)))
}

// ---- dashboard ----

pub struct EvaluationLink {
    pub template_id: String,
    pub name: String,
    pub kind: &'static str,
    pub status: String,
    pub fillable: bool,
}

pub struct SupervisedRow {
    pub id: String,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub position: String,
    pub company_name: String,
    pub period: String,
    pub status: String,
    pub status_code: &'static str,
    pub letter_url: String,
    pub approval_notes: String,
    pub rejection_reason: String,
    pub evaluations: Vec<EvaluationLink>,
}

#[derive(Template)]
#[template(path = "supervisor/dashboard.html")]
struct DashboardTemplate {
    page: Page,
    company: String,
    pending: usize,
    accepted: usize,
    completed: usize,
    rows: Vec<SupervisedRow>,
}

fn evaluation_links(
    t: &I18n,
    row: &ConfirmationWithStudent,
    templates: &[EvaluationTemplate],
    records: &[EvaluationRecord],
    now: OffsetDateTime,
) -> Vec<EvaluationLink> {
    if !matches!(
        row.confirmation.status,
        ConfirmationStatus::Accepted | ConfirmationStatus::Completed
    ) {
        return Vec::new();
    }
    templates
        .iter()
        .map(|template| {
            let record = records
                .iter()
                .find(|r| r.confirmation_id == row.confirmation.id && r.template_id == template.id);
            let status = record.map(|r| r.status.as_str()).unwrap_or("not_created");
            EvaluationLink {
                template_id: template.id.to_string(),
                name: template.name.clone(),
                kind: template.kind.label(),
                status: label(t, "evaluation-status", status),
                fillable: template.can_be_filled(now)
                    && !record.is_some_and(|r| r.status.is_answered()),
            }
        })
        .collect()
}

pub async fn dashboard(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
) -> AppResult<impl IntoResponse> {
    let profile = SupervisorProfileRepository::get_or_create(&state.db, &supervisor.user).await?;
    let confirmations =
        ConfirmationRepository::list_for_supervisor_email(&state.db, &profile.email).await?;
    let ids: Vec<Uuid> = confirmations.iter().map(|c| c.confirmation.id).collect();
    let records = EvaluationRecordRepository::list_for_confirmations(&state.db, &ids).await?;
    let templates = EvaluationTemplateRepository::list_active(&state.db).await?;
    let now = OffsetDateTime::now_utc();

    let count = |status: ConfirmationStatus| {
        confirmations
            .iter()
            .filter(|c| c.confirmation.status == status)
            .count()
    };
    let (pending, accepted, completed) = (
        count(ConfirmationStatus::Pending),
        count(ConfirmationStatus::Accepted),
        count(ConfirmationStatus::Completed),
    );

    let page = Page::for_user(&state, &supervisor, "title-supervisor-dashboard").await;
    let rows = confirmations
        .iter()
        .map(|row| {
            let c = &row.confirmation;
            SupervisedRow {
                id: c.id.to_string(),
                student_name: row.student_name.clone(),
                student_number: row.student_number.clone(),
                study_program: row.study_program.clone(),
                position: c.position.clone(),
                company_name: c.company_name.clone(),
                period: c.period_label(),
                status: label(&page.t, "confirmation-status", c.status.as_str()),
                status_code: c.status.as_str(),
                letter_url: c.acceptance_letter_url.clone().unwrap_or_default(),
                approval_notes: c.approval_notes.clone().unwrap_or_default(),
                rejection_reason: c.rejection_reason.clone().unwrap_or_default(),
                evaluations: evaluation_links(&page.t, row, &templates, &records, now),
            }
        })
        .collect();

    Ok(HtmlTemplate(DashboardTemplate {
        page,
        company: profile.company,
        pending,
        accepted,
        completed,
        rows,
    }))
}

// ---- review and completion ----

#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub action: String,
    #[serde(default)]
    pub notes: String,
}

pub async fn review(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
    Path(id): Path<Uuid>,
    Form(form): Form<ReviewForm>,
) -> AppResult<Response> {
    let Some(decision) = ReviewDecision::from_form(&form.action, &form.notes) else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-form-invalid",
            DASHBOARD,
        )
        .await);
    };
    if matches!(&decision, ReviewDecision::Reject { reason } if reason.is_empty()) {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-reason-required",
            DASHBOARD,
        )
        .await);
    }
    let (profile, row) = match supervised(&state, &supervisor, id).await? {
        Ok(found) => found,
        Err(response) => return Ok(response),
    };

    let mut tx = state.db.begin().await?;
    let Some(current) = ConfirmationRepository::find_for_update(&mut tx, id).await? else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-not-found",
            DASHBOARD,
        )
        .await);
    };
    let target = match plan_review(&profile, &current, &decision) {
        Ok(target) => target,
        Err(e) => {
            tracing::info!(confirmation_id = %id, error = %e, "Review refused");
            return Ok(flash_redirect(
                &state,
                &supervisor,
                FlashLevel::Error,
                "error-invalid-transition",
                DASHBOARD,
            )
            .await);
        }
    };
    let Some(updated) = ConfirmationRepository::transition(
        &mut tx,
        id,
        current.status,
        target,
        decision.approval_notes(),
        decision.rejection_reason(),
    )
    .await?
    else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-invalid-transition",
            DASHBOARD,
        )
        .await);
    };

    let created = if decision.creates_evaluations() {
        EvaluationRecordRepository::create_pending_for_active_templates(&mut *tx, id).await?
    } else {
        0
    };

    let t = I18n::new(state.localizer.clone(), supervisor.language);
    let status = label(&t, "confirmation-status", updated.status.as_str());
    let mut notifications = Vec::new();
    let student_notice = NewNotification::new(
        updated.student_id,
        decision.student_notice_kind(),
        t.get("notify-confirmation-reviewed-title"),
        t.get_with_args(
            "notify-confirmation-reviewed",
            &crate::i18n_args!(
                "company" => updated.company_name.clone(),
                "status" => status.clone()
            ),
        ),
    )
    .with_link("/student/confirmation");
    notifications.push(NotificationRepository::create(&mut *tx, &student_notice).await?);

    let heads = DepartmentHeadRepository::user_ids_for_program(&mut tx, &row.study_program).await?;
    for head_id in heads {
        let notice = NewNotification::new(
            head_id,
            NotificationKind::Info,
            t.get("notify-program-update-title"),
            t.get_with_args(
                "notify-program-update",
                &crate::i18n_args!(
                    "student" => row.student_name.clone(),
                    "company" => updated.company_name.clone(),
                    "status" => status.clone()
                ),
            ),
        )
        .with_link("/kaprodi");
        notifications.push(NotificationRepository::create(&mut *tx, &notice).await?);
    }
    tx.commit().await?;
    publish_all(&state, notifications);

    tracing::info!(
        confirmation_id = %id,
        status = updated.status.as_str(),
        evaluations_created = created,
        "Confirmation reviewed"
    );
    let key = if decision.creates_evaluations() {
        "confirmation-accepted"
    } else {
        "confirmation-rejected"
    };
    Ok(flash_redirect(&state, &supervisor, FlashLevel::Success, key, DASHBOARD).await)
}

pub async fn complete(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let (profile, _) = match supervised(&state, &supervisor, id).await? {
        Ok(found) => found,
        Err(response) => return Ok(response),
    };

    let mut tx = state.db.begin().await?;
    let Some(current) = ConfirmationRepository::find_for_update(&mut tx, id).await? else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-not-found",
            DASHBOARD,
        )
        .await);
    };
    let target = match plan_completion(&profile, &current) {
        Ok(target) => target,
        Err(e) => {
            tracing::info!(confirmation_id = %id, error = %e, "Completion refused");
            return Ok(flash_redirect(
                &state,
                &supervisor,
                FlashLevel::Error,
                "error-invalid-transition",
                DASHBOARD,
            )
            .await);
        }
    };
    let updated =
        ConfirmationRepository::transition(&mut tx, id, current.status, target, None, None).await?;
    let Some(updated) = updated else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-invalid-transition",
            DASHBOARD,
        )
        .await);
    };
    let finished = EvaluationRecordRepository::finish_all(&mut tx, id).await?;

    let t = I18n::new(state.localizer.clone(), supervisor.language);
    let notice = NewNotification::new(
        updated.student_id,
        NotificationKind::Success,
        t.get("notify-internship-completed-title"),
        t.get_with_args(
            "notify-internship-completed",
            &crate::i18n_args!("company" => updated.company_name.clone()),
        ),
    )
    .with_link("/student/certificate");
    let notification = NotificationRepository::create(&mut *tx, &notice).await?;
    tx.commit().await?;
    state.publish(notification);

    tracing::info!(confirmation_id = %id, evaluations_finished = finished, "Internship completed");
    Ok(flash_redirect(
        &state,
        &supervisor,
        FlashLevel::Success,
        "internship-completed",
        DASHBOARD,
    )
    .await)
}

// ---- evaluation form ----

pub struct QuestionView {
    pub index: usize,
    pub text: String,
    pub answer: String,
}

#[derive(Template)]
#[template(path = "supervisor/evaluate.html")]
struct EvaluateTemplate {
    page: Page,
    confirmation_id: String,
    template_id: String,
    template_name: String,
    kind: &'static str,
    student_name: String,
    student_number: String,
    company_name: String,
    period_status: String,
    questions: Vec<QuestionView>,
    read_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateQuery {
    pub template: Option<Uuid>,
}

async fn evaluation_template(
    state: &AppState,
    requested: Option<Uuid>,
) -> AppResult<Option<EvaluationTemplate>> {
    match requested {
        Some(id) => Ok(EvaluationTemplateRepository::find_by_id(&state.db, id).await?),
        None => {
            let now = OffsetDateTime::now_utc();
            let active = EvaluationTemplateRepository::list_active(&state.db).await?;
            Ok(active.into_iter().find(|t| t.can_be_filled(now)))
        }
    }
}

pub async fn evaluate_form(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
    Path(id): Path<Uuid>,
    Query(query): Query<EvaluateQuery>,
) -> AppResult<Response> {
    let (_, row) = match supervised(&state, &supervisor, id).await? {
        Ok(found) => found,
        Err(response) => return Ok(response),
    };
    if !matches!(
        row.confirmation.status,
        ConfirmationStatus::Accepted | ConfirmationStatus::Completed
    ) {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Warning,
            "error-not-accepted",
            DASHBOARD,
        )
        .await);
    }
    let Some(template) = evaluation_template(&state, query.template).await? else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Info,
            "error-no-open-evaluation",
            DASHBOARD,
        )
        .await);
    };
    let record = EvaluationRecordRepository::find(&state.db, id, template.id).await?;
    let now = OffsetDateTime::now_utc();

    let read_only = !template.can_be_filled(now)
        || record.as_ref().is_some_and(|r| r.status.is_answered());
    let page = Page::for_user(&state, &supervisor, "title-evaluate").await;
    let questions = template
        .question_list()
        .iter()
        .enumerate()
        .map(|(index, text)| QuestionView {
            index,
            text: text.clone(),
            answer: record
                .as_ref()
                .and_then(|r| r.answer(index))
                .unwrap_or_default()
                .to_string(),
        })
        .collect();

    Ok(HtmlTemplate(EvaluateTemplate {
        period_status: label(&page.t, "period-status", template.period_status(now).as_str()),
        confirmation_id: id.to_string(),
        template_id: template.id.to_string(),
        template_name: template.name.clone(),
        kind: template.kind.label(),
        student_name: row.student_name,
        student_number: row.student_number,
        company_name: row.confirmation.company_name,
        questions,
        read_only,
        page,
    })
    .into_response())
}

pub async fn submit_evaluation(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
    Path(id): Path<Uuid>,
    Form(fields): Form<Vec<(String, String)>>,
) -> AppResult<Response> {
    let (_, row) = match supervised(&state, &supervisor, id).await? {
        Ok(found) => found,
        Err(response) => return Ok(response),
    };
    let template_id = fields
        .iter()
        .find(|(name, _)| name == "template_id")
        .and_then(|(_, value)| Uuid::parse_str(value).ok());
    let Some(template) = evaluation_template(&state, template_id).await? else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-not-found",
            DASHBOARD,
        )
        .await);
    };
    let back = format!("/supervisor/confirmations/{id}/evaluate?template={}", template.id);

    if row.confirmation.status != ConfirmationStatus::Accepted {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-evaluation-locked",
            &back,
        )
        .await);
    }
    if !template.can_be_filled(OffsetDateTime::now_utc()) {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-evaluation-closed",
            &back,
        )
        .await);
    }
    let existing = EvaluationRecordRepository::find(&state.db, id, template.id).await?;
    if existing.is_some_and(|r| r.status.is_answered()) {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-evaluation-locked",
            &back,
        )
        .await);
    }

    let answers = collect_answers(
        fields.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        template.question_list().len(),
    );
    if answers.values().all(|a| a.is_empty()) {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-answers-required",
            &back,
        )
        .await);
    }
    let saved =
        EvaluationRecordRepository::save_answers(&state.db, id, template.id, &answers).await?;
    let Some(record) = saved else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-evaluation-locked",
            &back,
        )
        .await);
    };
    tracing::info!(record_id = %record.id, template_id = %template.id, "Evaluation submitted");
    Ok(flash_redirect(
        &state,
        &supervisor,
        FlashLevel::Success,
        "evaluation-saved",
        DASHBOARD,
    )
    .await)
}

// ---- progress reports ----

pub struct ProgressView {
    pub id: String,
    pub month: String,
    pub status: String,
    pub reviewable: bool,
    pub submitted_at: String,
    pub company_profile: String,
    pub job_description: String,
    pub work_environment: String,
    pub useful_coursework: String,
    pub learning_gaps: String,
}

pub struct FinalView {
    pub status: String,
    pub file_url: String,
    pub activity_summary: String,
    pub achievements: String,
}

#[derive(Template)]
#[template(path = "supervisor/reports.html")]
struct ReportsTemplate {
    page: Page,
    student_name: String,
    company_name: String,
    reports: Vec<ProgressView>,
    final_report: Option<FinalView>,
}

pub async fn reports(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let (_, row) = match supervised(&state, &supervisor, id).await? {
        Ok(found) => found,
        Err(response) => return Ok(response),
    };
    let progress = ProgressReportRepository::list_for_confirmation(&state.db, id).await?;
    let final_report = FinalReportRepository::find_for_confirmation(&state.db, id).await?;
    let page = Page::for_user(&state, &supervisor, "title-supervisor-reports").await;

    let reports = progress
        .into_iter()
        .filter(|r| !r.status.is_editable() || r.submitted_at.is_some())
        .map(|r| ProgressView {
            id: r.id.to_string(),
            month: month_key(r.month),
            status: label(&page.t, "report-status", r.status.as_str()),
            reviewable: r.status == crate::db::models::ProgressReportStatus::Submitted,
            submitted_at: display_datetime(r.submitted_at),
            company_profile: r.company_profile,
            job_description: r.job_description,
            work_environment: r.work_environment,
            useful_coursework: r.useful_coursework,
            learning_gaps: r.learning_gaps,
        })
        .collect();
    let final_report = final_report.map(|r| FinalView {
        status: label(&page.t, "final-status", r.status.as_str()),
        file_url: r.file_url.unwrap_or_default(),
        activity_summary: r.activity_summary,
        achievements: r.achievements,
    });

    Ok(HtmlTemplate(ReportsTemplate {
        page,
        student_name: row.student_name,
        company_name: row.confirmation.company_name,
        reports,
        final_report,
    })
    .into_response())
}

pub async fn review_progress_report(
    State(state): State<AppState>,
    supervisor: SupervisorUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(report) = ProgressReportRepository::find_by_id(&state.db, report_id).await? else {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Error,
            "error-not-found",
            DASHBOARD,
        )
        .await);
    };
    if let Err(response) = supervised(&state, &supervisor, report.confirmation_id).await? {
        return Ok(response);
    }
    let back = format!("/supervisor/confirmations/{}/reports", report.confirmation_id);
    if !ProgressReportRepository::mark_reviewed(&state.db, report_id).await? {
        return Ok(flash_redirect(
            &state,
            &supervisor,
            FlashLevel::Warning,
            "error-report-not-submitted",
            &back,
        )
        .await);
    }
    tracing::info!(report_id = %report_id, "Progress report reviewed");
    Ok(flash_redirect(
        &state,
        &supervisor,
        FlashLevel::Success,
        "progress-report-reviewed",
        &back,
    )
    .await)
}
