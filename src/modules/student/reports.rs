//! Monthly progress reports, the final report and weekly status reports.

use askama::Template;
use axum::{
    extract::{Multipart, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::StudentUser;
use crate::db::models::{
    first_of_month, month_key, parse_month, recent_months, ApplicationStatus, ConfirmationStatus,
    FinalReportInput, FinalReportStatus, FlashLevel, InternshipConfirmation, NewNotification,
    NotificationKind, ProgressReport, ProgressReportInput, ProgressReportStatus, WeeklyReport,
    WeeklyReportInput,
};
use crate::db::repositories::{
    ConfirmationRepository, DeadlinePolicyRepository, FinalReportRepository,
    NotificationRepository, ProgressReportRepository, StudentProfileRepository,
    WeeklyReportRepository,
};
use crate::error::AppResult;
use crate::i18n::I18n;
use crate::modules::common::{
    display_datetime, flash_message_redirect, flash_redirect, label, parse_date, today,
    upload_error_key, validation_message, HtmlTemplate, MultipartForm, Page, SelectOption,
};
use crate::storage::report_file_name;
use crate::workflow::{select_week, weekly_reporting_open};

/// The student's placement once a supervisor has accepted it.
async fn active_placement(
    state: &AppState,
    student: &StudentUser,
) -> AppResult<Result<InternshipConfirmation, Response>> {
    let confirmation = ConfirmationRepository::find_by_student(&state.db, student.user.id).await?;
    match confirmation {
        Some(c)
            if matches!(c.status, ConfirmationStatus::Accepted | ConfirmationStatus::Completed) =>
        {
            Ok(Ok(c))
        }
        _ => Ok(Err(flash_redirect(
            state,
            student,
            FlashLevel::Warning,
            "error-no-active-internship",
            "/student",
        )
        .await)),
    }
}

/// Lets the assigned supervisor know a report arrived. Best effort.
async fn notify_supervisor(
    state: &AppState,
    confirmation: &InternshipConfirmation,
    title: String,
    message: String,
    link: &str,
) {
    let Some(supervisor_id) = confirmation.supervisor_user_id else {
        return;
    };
    let notice =
        NewNotification::new(supervisor_id, NotificationKind::Info, title, message).with_link(link);
    match NotificationRepository::create(&state.db, &notice).await {
        Ok(notification) => state.publish(notification),
        Err(e) => tracing::warn!(error = %e, "Failed to notify supervisor"),
    }
}

// ---- monthly progress reports ----

pub struct MonthRow {
    pub key: String,
    pub status: String,
    pub submitted_at: String,
    pub exists: bool,
}

#[derive(Template)]
#[template(path = "student/progress_reports.html")]
struct ProgressReportsTemplate {
    page: Page,
    months: Vec<MonthRow>,
}

pub async fn progress_reports(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<Response> {
    let confirmation = match active_placement(&state, &student).await? {
        Ok(c) => c,
        Err(response) => return Ok(response),
    };
    let reports =
        ProgressReportRepository::list_for_confirmation(&state.db, confirmation.id).await?;
    let page = Page::for_user(&state, &student, "title-progress-reports").await;

    let mut months: Vec<MonthRow> = recent_months(today(), 6)
        .into_iter()
        .map(|month| {
            let report = reports.iter().find(|r| r.month == month);
            MonthRow {
                key: month_key(month),
                status: report
                    .map(|r| label(&page.t, "report-status", r.status.as_str()))
                    .unwrap_or_else(|| page.t.get("report-missing")),
                submitted_at: display_datetime(report.and_then(|r| r.submitted_at)),
                exists: report.is_some(),
            }
        })
        .collect();
    // Older reports outside the recent window still belong on the list.
    for report in &reports {
        let key = month_key(report.month);
        if !months.iter().any(|m| m.key == key) {
            months.push(MonthRow {
                key,
                status: label(&page.t, "report-status", report.status.as_str()),
                submitted_at: display_datetime(report.submitted_at),
                exists: true,
            });
        }
    }

    Ok(HtmlTemplate(ProgressReportsTemplate { page, months }).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressReportForm {
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub company_profile: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub work_environment: String,
    #[serde(default)]
    pub useful_coursework: String,
    #[serde(default)]
    pub learning_gaps: String,
    #[serde(default)]
    pub action: String,
}

impl ProgressReportForm {
    fn from_report(report: &ProgressReport) -> Self {
        ProgressReportForm {
            month: month_key(report.month),
            company_profile: report.company_profile.clone(),
            job_description: report.job_description.clone(),
            work_environment: report.work_environment.clone(),
            useful_coursework: report.useful_coursework.clone(),
            learning_gaps: report.learning_gaps.clone(),
            action: String::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "student/progress_report_form.html")]
struct ProgressReportFormTemplate {
    page: Page,
    form: ProgressReportForm,
    status: String,
    editable: bool,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

pub async fn progress_report_form(
    State(state): State<AppState>,
    student: StudentUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Response> {
    let confirmation = match active_placement(&state, &student).await? {
        Ok(c) => c,
        Err(response) => return Ok(response),
    };
    let month = query
        .month
        .as_deref()
        .and_then(parse_month)
        .unwrap_or_else(|| first_of_month(today()));
    let report = ProgressReportRepository::find(&state.db, confirmation.id, month).await?;
    let page = Page::for_user(&state, &student, "title-progress-report").await;

    let (form, status, editable) = match &report {
        Some(r) => (
            ProgressReportForm::from_report(r),
            label(&page.t, "report-status", r.status.as_str()),
            r.status.is_editable(),
        ),
        None => (
            ProgressReportForm {
                month: month_key(month),
                ..Default::default()
            },
            page.t.get("report-missing"),
            true,
        ),
    };
    Ok(HtmlTemplate(ProgressReportFormTemplate {
        page,
        form,
        status,
        editable,
    })
    .into_response())
}

pub async fn save_progress_report(
    State(state): State<AppState>,
    student: StudentUser,
    Form(form): Form<ProgressReportForm>,
) -> AppResult<Response> {
    let confirmation = match active_placement(&state, &student).await? {
        Ok(c) => c,
        Err(response) => return Ok(response),
    };
    let back = format!("/student/progress-report?month={}", form.month);
    let Some(month) = parse_month(&form.month) else {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Error,
            "error-form-invalid",
            "/student/progress-reports",
        )
        .await);
    };
    let submitting = form.action == "submit";
    let input = ProgressReportInput {
        month,
        company_profile: form.company_profile.trim().to_string(),
        job_description: form.job_description.trim().to_string(),
        work_environment: form.work_environment.trim().to_string(),
        useful_coursework: form.useful_coursework.trim().to_string(),
        learning_gaps: form.learning_gaps.trim().to_string(),
        status: if submitting {
            ProgressReportStatus::Submitted
        } else {
            ProgressReportStatus::Draft
        },
    };
    if let Err(errors) = input.validate() {
        let t = I18n::new(state.localizer.clone(), student.language);
        let message = validation_message(&t, &errors);
        return Ok(flash_message_redirect(
            &state,
            &student,
            FlashLevel::Error,
            message,
            &back,
        )
        .await);
    }

    let saved = ProgressReportRepository::upsert(&state.db, confirmation.id, &input).await?;
    let Some(report) = saved else {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Error,
            "error-report-locked",
            &back,
        )
        .await);
    };
    tracing::info!(
        report_id = %report.id,
        month = %form.month,
        status = report.status.as_str(),
        "Progress report saved"
    );

    if submitting {
        let t = I18n::new(state.localizer.clone(), student.language);
        notify_supervisor(
            &state,
            &confirmation,
            t.get("notify-progress-report-title"),
            t.get_with_args(
                "notify-progress-report",
                &crate::i18n_args!(
                    "student" => student.user.full_name.clone(),
                    "month" => form.month.clone()
                ),
            ),
            &format!("/supervisor/confirmations/{}/reports", confirmation.id),
        )
        .await;
    }

    let key = if submitting {
        "progress-report-submitted"
    } else {
        "progress-report-saved"
    };
    Ok(flash_redirect(&state, &student, FlashLevel::Success, key, &back).await)
}

// ---- final report ----

#[derive(Debug, Default)]
pub struct FinalReportView {
    pub activity_summary: String,
    pub achievements: String,
    pub obstacles_and_solutions: String,
    pub suggestions_for_company: String,
    pub suggestions_for_campus: String,
    pub file_url: String,
}

#[derive(Template)]
#[template(path = "student/final_report.html")]
struct FinalReportTemplate {
    page: Page,
    form: FinalReportView,
    status: String,
    editable: bool,
}

pub async fn final_report_form(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<Response> {
    let confirmation = match active_placement(&state, &student).await? {
        Ok(c) => c,
        Err(response) => return Ok(response),
    };
    let report = FinalReportRepository::find_for_confirmation(&state.db, confirmation.id).await?;
    let page = Page::for_user(&state, &student, "title-final-report").await;
    let (form, status, editable) = match report {
        Some(r) => (
            FinalReportView {
                activity_summary: r.activity_summary,
                achievements: r.achievements,
                obstacles_and_solutions: r.obstacles_and_solutions,
                suggestions_for_company: r.suggestions_for_company,
                suggestions_for_campus: r.suggestions_for_campus,
                file_url: r.file_url.unwrap_or_default(),
            },
            label(&page.t, "final-status", r.status.as_str()),
            r.status != FinalReportStatus::Approved,
        ),
        None => (FinalReportView::default(), page.t.get("report-missing"), true),
    };
    Ok(HtmlTemplate(FinalReportTemplate {
        page,
        form,
        status,
        editable,
    })
    .into_response())
}

pub async fn save_final_report(
    State(state): State<AppState>,
    student: StudentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    const BACK: &str = "/student/final-report";
    let confirmation = match active_placement(&state, &student).await? {
        Ok(c) => c,
        Err(response) => return Ok(response),
    };
    let form = MultipartForm::read(multipart).await?;
    let existing = FinalReportRepository::find_for_confirmation(&state.db, confirmation.id).await?;
    let submitting = form.text("action") == "submit";

    let mut file_url = existing.as_ref().and_then(|r| r.file_url.clone());
    if let Some(file) = form.file("report_file") {
        if let Err(e) = file.validate_document(state.env.app.max_upload_bytes) {
            return Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Error,
                upload_error_key(&e),
                BACK,
            )
            .await);
        }
        let student_number = StudentProfileRepository::find_by_user(&state.db, student.user.id)
            .await?
            .map(|p| p.student_number)
            .unwrap_or_else(|| student.user.id.to_string());
        let name = report_file_name("final", &student_number, &file.extension());
        let content_type = file.effective_content_type();
        match state
            .storage
            .upload(file.bytes.clone(), "final_reports", Some(&name), &content_type)
            .await
        {
            Ok(url) => file_url = Some(url),
            Err(e) => {
                tracing::error!(error = %e, "Final report upload failed");
                return Ok(flash_redirect(
                    &state,
                    &student,
                    FlashLevel::Error,
                    "error-upload-failed",
                    BACK,
                )
                .await);
            }
        }
    }

    let input = FinalReportInput {
        activity_summary: form.text("activity_summary"),
        achievements: form.text("achievements"),
        obstacles_and_solutions: form.text("obstacles_and_solutions"),
        suggestions_for_company: form.text("suggestions_for_company"),
        suggestions_for_campus: form.text("suggestions_for_campus"),
        file_url,
        status: if submitting {
            FinalReportStatus::Submitted
        } else {
            FinalReportStatus::Draft
        },
    };
    if let Err(errors) = input.validate() {
        let t = I18n::new(state.localizer.clone(), student.language);
        let message = validation_message(&t, &errors);
        return Ok(flash_message_redirect(&state, &student, FlashLevel::Error, message, BACK).await);
    }

    let saved = FinalReportRepository::upsert(&state.db, confirmation.id, &input).await?;
    let Some(report) = saved else {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Error,
            "error-report-locked",
            BACK,
        )
        .await);
    };
    tracing::info!(report_id = %report.id, status = report.status.as_str(), "Final report saved");

    if submitting {
        let t = I18n::new(state.localizer.clone(), student.language);
        notify_supervisor(
            &state,
            &confirmation,
            t.get("notify-final-report-title"),
            t.get_with_args(
                "notify-final-report",
                &crate::i18n_args!("student" => student.user.full_name.clone()),
            ),
            "/supervisor",
        )
        .await;
    }

    let key = if submitting {
        "final-report-submitted"
    } else {
        "final-report-saved"
    };
    Ok(flash_redirect(&state, &student, FlashLevel::Success, key, BACK).await)
}

// ---- weekly status reports ----

pub struct WeeklyRow {
    pub week_number: i32,
    pub week_start: String,
    pub week_end: String,
    pub progress: i16,
    pub status: String,
    pub is_late: bool,
    pub submitted_at: String,
}

impl WeeklyRow {
    pub fn new(t: &I18n, r: &WeeklyReport) -> Self {
        WeeklyRow {
            week_number: r.week_number,
            week_start: r.week_start.to_string(),
            week_end: r.week_end.to_string(),
            progress: r.progress_percentage,
            status: label(t, "application-status", r.application_status.as_str()),
            is_late: r.is_late,
            submitted_at: display_datetime(Some(r.submitted_at)),
        }
    }
}

#[derive(Template)]
#[template(path = "student/weekly_reports.html")]
struct WeeklyReportsTemplate {
    page: Page,
    open: bool,
    deadline: String,
    reports: Vec<WeeklyRow>,
}

async fn weekly_gate(
    state: &AppState,
    student: &StudentUser,
) -> AppResult<(bool, Option<time::Date>)> {
    let confirmation = ConfirmationRepository::find_by_student(&state.db, student.user.id).await?;
    let policy = DeadlinePolicyRepository::find_active(&state.db).await?;
    let open = weekly_reporting_open(confirmation.map(|c| c.status), policy.as_ref(), today());
    Ok((open, policy.map(|p| p.deadline_date)))
}

pub async fn weekly_reports(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<impl IntoResponse> {
    let (open, deadline) = weekly_gate(&state, &student).await?;
    let reports = WeeklyReportRepository::list_for_student(&state.db, student.user.id).await?;
    let page = Page::for_user(&state, &student, "title-weekly-reports").await;
    let reports = reports.iter().map(|r| WeeklyRow::new(&page.t, r)).collect();
    Ok(HtmlTemplate(WeeklyReportsTemplate {
        page,
        open,
        deadline: deadline.map(|d| d.to_string()).unwrap_or_default(),
        reports,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct WeeklyReportForm {
    #[serde(default)]
    pub week: String,
    #[serde(default)]
    pub main_activities: String,
    #[serde(default)]
    pub target_achievement: String,
    #[serde(default)]
    pub companies_applied: String,
    #[serde(default)]
    pub interview_status: String,
    #[serde(default)]
    pub challenges_faced: String,
    #[serde(default)]
    pub help_needed: String,
    #[serde(default)]
    pub next_week_plan: String,
    #[serde(default)]
    pub progress_percentage: String,
    #[serde(default)]
    pub application_status: String,
}

impl WeeklyReportForm {
    fn from_report(r: &WeeklyReport) -> Self {
        WeeklyReportForm {
            week: r.week_start.to_string(),
            main_activities: r.main_activities.clone(),
            target_achievement: r.target_achievement.clone(),
            companies_applied: r.companies_applied.clone(),
            interview_status: r.interview_status.clone(),
            challenges_faced: r.challenges_faced.clone(),
            help_needed: r.help_needed.clone(),
            next_week_plan: r.next_week_plan.clone(),
            progress_percentage: r.progress_percentage.to_string(),
            application_status: r.application_status.as_str().to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "student/weekly_report_form.html")]
struct WeeklyReportFormTemplate {
    page: Page,
    form: WeeklyReportForm,
    week_number: i32,
    week_start: String,
    week_end: String,
    is_late: bool,
    statuses: Vec<SelectOption>,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub week: Option<String>,
}

const STATUS_VALUES: [&str; 6] = [
    "searching",
    "applied",
    "interview_scheduled",
    "waiting_response",
    "accepted",
    "rejected",
];

pub async fn weekly_report_form(
    State(state): State<AppState>,
    student: StudentUser,
    Query(query): Query<WeekQuery>,
) -> AppResult<Response> {
    const LIST: &str = "/student/weekly-reports";
    let (open, deadline) = weekly_gate(&state, &student).await?;
    let (true, Some(deadline)) = (open, deadline) else {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Info,
            "weekly-not-open",
            LIST,
        )
        .await);
    };
    let today = today();
    let requested = query.week.as_deref().and_then(parse_date);
    let window = match select_week(requested, today, deadline) {
        Ok(window) => window,
        Err(_) => {
            return Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Error,
                "error-week-out-of-range",
                LIST,
            )
            .await)
        }
    };
    let existing =
        WeeklyReportRepository::find_for_week(&state.db, student.user.id, window.start).await?;
    let form = existing
        .as_ref()
        .map(WeeklyReportForm::from_report)
        .unwrap_or_else(|| WeeklyReportForm {
            week: window.start.to_string(),
            progress_percentage: "0".into(),
            application_status: ApplicationStatus::Searching.as_str().into(),
            ..Default::default()
        });

    let page = Page::for_user(&state, &student, "title-weekly-report").await;
    let statuses = SelectOption::list(
        &page.t,
        "application-status",
        &STATUS_VALUES,
        &form.application_status,
    );
    Ok(HtmlTemplate(WeeklyReportFormTemplate {
        page,
        week_number: window.number,
        week_start: window.start.to_string(),
        week_end: window.end.to_string(),
        is_late: window.is_late(today),
        statuses,
        form,
    })
    .into_response())
}

pub async fn save_weekly_report(
    State(state): State<AppState>,
    student: StudentUser,
    Form(form): Form<WeeklyReportForm>,
) -> AppResult<Response> {
    const LIST: &str = "/student/weekly-reports";
    let (open, deadline) = weekly_gate(&state, &student).await?;
    let (true, Some(deadline)) = (open, deadline) else {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Info,
            "weekly-not-open",
            LIST,
        )
        .await);
    };
    let today = today();
    let window = match select_week(parse_date(&form.week), today, deadline) {
        Ok(window) => window,
        Err(_) => {
            return Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Error,
                "error-week-out-of-range",
                LIST,
            )
            .await)
        }
    };
    let back = format!("/student/weekly-report?week={}", window.start);

    let (Ok(progress), Some(application_status)) = (
        form.progress_percentage.trim().parse::<i16>(),
        ApplicationStatus::parse(&form.application_status),
    ) else {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Error,
            "error-form-invalid",
            &back,
        )
        .await);
    };
    let input = WeeklyReportInput {
        main_activities: form.main_activities.trim().to_string(),
        target_achievement: form.target_achievement.trim().to_string(),
        companies_applied: form.companies_applied.trim().to_string(),
        interview_status: form.interview_status.trim().to_string(),
        challenges_faced: form.challenges_faced.trim().to_string(),
        help_needed: form.help_needed.trim().to_string(),
        next_week_plan: form.next_week_plan.trim().to_string(),
        progress_percentage: progress,
        application_status,
    };
    if let Err(errors) = input.validate() {
        let t = I18n::new(state.localizer.clone(), student.language);
        let message = validation_message(&t, &errors);
        return Ok(flash_message_redirect(
            &state,
            &student,
            FlashLevel::Error,
            message,
            &back,
        )
        .await);
    }

    let is_late = window.is_late(today);
    let report =
        WeeklyReportRepository::upsert(&state.db, student.user.id, &window, is_late, &input)
            .await?;
    tracing::info!(
        report_id = %report.id,
        week = report.week_number,
        is_late,
        "Weekly report saved"
    );
    let key = if is_late {
        "weekly-report-saved-late"
    } else {
        "weekly-report-saved"
    };
    Ok(flash_redirect(&state, &student, FlashLevel::Success, key, LIST).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_values_match_the_enum() {
        let from_enum: Vec<&str> = ApplicationStatus::all().iter().map(|s| s.as_str()).collect();
        assert_eq!(from_enum, STATUS_VALUES);
    }
}
