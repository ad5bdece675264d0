//! Report oversight and the weekly-report deadline policy.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::models::{
    first_of_month, month_key, parse_month, DeadlinePolicyInput, FinalReportStatus, FlashLevel,
    NewNotification, NotificationKind, WeekWindow,
};
use crate::db::repositories::{
    ConfirmationRepository, DeadlinePolicyRepository, FinalReportRepository, NotificationRepository,
    ProgressReportRepository, WeeklyReportRepository,
};
use crate::error::AppResult;
use crate::i18n::I18n;
use crate::modules::common::{
    display_datetime, flash_message_redirect, flash_redirect, is_checked, label, parse_date, today,
    validation_message, HtmlTemplate, Page,
};
use crate::modules::student::reports::WeeklyRow;
use crate::workflow::days_overdue;

// ---- monthly progress reports ----

pub struct ProgressListingRow {
    pub month: String,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
    pub status: String,
    pub submitted_at: String,
}

pub struct MissingRow {
    pub student_name: String,
    pub company_name: String,
}

#[derive(Template)]
#[template(path = "admin/progress_reports.html")]
struct ProgressReportsTemplate {
    page: Page,
    month: String,
    reports: Vec<ProgressListingRow>,
    missing: Vec<MissingRow>,
}

#[derive(Debug, Deserialize)]
pub struct MonthFilter {
    pub month: Option<String>,
}

pub async fn progress_reports(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(filter): Query<MonthFilter>,
) -> AppResult<impl IntoResponse> {
    let month = filter
        .month
        .as_deref()
        .and_then(parse_month)
        .unwrap_or_else(|| first_of_month(today()));
    let reports = ProgressReportRepository::list_all(&state.db, Some(month)).await?;
    let missing = ProgressReportRepository::missing_for_month(&state.db, month).await?;
    let page = Page::for_user(&state, &admin, "title-admin-progress-reports").await;

    let reports = reports
        .into_iter()
        .map(|r| ProgressListingRow {
            month: month_key(r.month),
            status: label(&page.t, "report-status", r.status.as_str()),
            submitted_at: display_datetime(r.submitted_at),
            student_name: r.student_name,
            student_number: r.student_number,
            company_name: r.company_name,
        })
        .collect();
    let missing = missing
        .into_iter()
        .map(|(_, student_name, company_name)| MissingRow {
            student_name,
            company_name,
        })
        .collect();

    Ok(HtmlTemplate(ProgressReportsTemplate {
        page,
        month: month_key(month),
        reports,
        missing,
    }))
}

// ---- final reports ----

pub struct FinalListingRow {
    pub id: String,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
    pub status: String,
    pub approvable: bool,
    pub file_url: String,
    pub submitted_at: String,
    pub approved_at: String,
}

#[derive(Template)]
#[template(path = "admin/final_reports.html")]
struct FinalReportsTemplate {
    page: Page,
    reports: Vec<FinalListingRow>,
}

pub async fn final_reports(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let reports = FinalReportRepository::list_all(&state.db).await?;
    let page = Page::for_user(&state, &admin, "title-admin-final-reports").await;
    let reports = reports
        .into_iter()
        .map(|r| FinalListingRow {
            id: r.id.to_string(),
            status: label(&page.t, "final-status", r.status.as_str()),
            approvable: r.status == FinalReportStatus::Submitted,
            file_url: r.file_url.unwrap_or_default(),
            submitted_at: display_datetime(r.submitted_at),
            approved_at: display_datetime(r.approved_at),
            student_name: r.student_name,
            student_number: r.student_number,
            company_name: r.company_name,
        })
        .collect();
    Ok(HtmlTemplate(FinalReportsTemplate { page, reports }))
}

pub async fn approve_final_report(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    const BACK: &str = "/admin/final-reports";
    let listing = FinalReportRepository::list_all(&state.db)
        .await?
        .into_iter()
        .find(|r| r.id == id);
    let Some(listing) = listing else {
        return Ok(flash_redirect(&state, &admin, FlashLevel::Error, "error-not-found", BACK).await);
    };
    if !FinalReportRepository::approve(&state.db, id).await? {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Warning,
            "error-report-not-submitted",
            BACK,
        )
        .await);
    }

    if let Some(confirmation) =
        ConfirmationRepository::find_by_id(&state.db, listing.confirmation_id).await?
    {
        let t = I18n::new(state.localizer.clone(), admin.language);
        let notice = NewNotification::new(
            confirmation.student_id,
            NotificationKind::Success,
            t.get("notify-final-report-approved-title"),
            t.get("notify-final-report-approved"),
        )
        .with_link("/student/final-report");
        match NotificationRepository::create(&state.db, &notice).await {
            Ok(notification) => state.publish(notification),
            Err(e) => tracing::warn!(error = %e, "Failed to notify student"),
        }
    }
    tracing::info!(report_id = %id, "Final report approved");
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "final-report-approved", BACK).await)
}

// ---- weekly reports ----

pub struct WeeklyListingRow {
    pub student_name: String,
    pub student_number: String,
    pub row: WeeklyRow,
}

pub struct OverdueRow {
    pub student_name: String,
    pub student_number: String,
    pub email: String,
    pub last_week: String,
    pub days_overdue: i64,
}

#[derive(Template)]
#[template(path = "admin/weekly_reports.html")]
struct WeeklyReportsTemplate {
    page: Page,
    deadline: String,
    current_week: i32,
    reports: Vec<WeeklyListingRow>,
    overdue: Vec<OverdueRow>,
}

pub async fn weekly_reports(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let reports = WeeklyReportRepository::list_all(&state.db).await?;
    let policy = DeadlinePolicyRepository::find_active(&state.db).await?;
    let today = today();
    let page = Page::for_user(&state, &admin, "title-admin-weekly-reports").await;

    let (deadline, current_week, overdue) = match policy.filter(|p| p.is_overdue(today)) {
        Some(policy) => {
            let week = WeekWindow::containing(today, policy.deadline_date);
            let overdue = WeeklyReportRepository::overdue_students(&state.db, week.start)
                .await?
                .into_iter()
                .map(|s| OverdueRow {
                    last_week: s.last_week_start.map(|d| d.to_string()).unwrap_or_default(),
                    days_overdue: days_overdue(policy.deadline_date, today),
                    student_name: s.student_name,
                    student_number: s.student_number,
                    email: s.email,
                })
                .collect();
            (policy.deadline_date.to_string(), week.number, overdue)
        }
        None => (String::new(), 0, Vec::new()),
    };

    let reports = reports
        .iter()
        .map(|listing| WeeklyListingRow {
            student_name: listing.student_name.clone(),
            student_number: listing.student_number.clone(),
            row: WeeklyRow::new(&page.t, &listing.report),
        })
        .collect();

    Ok(HtmlTemplate(WeeklyReportsTemplate {
        page,
        deadline,
        current_week,
        reports,
        overdue,
    }))
}

// ---- deadline policy ----

pub struct PolicyRow {
    pub id: String,
    pub deadline_date: String,
    pub reminder_frequency_days: i32,
    pub description: String,
    pub email_reminder_enabled: bool,
    pub is_active: bool,
    pub days_until: i64,
}

#[derive(Template)]
#[template(path = "admin/deadlines.html")]
struct DeadlinesTemplate {
    page: Page,
    policies: Vec<PolicyRow>,
}

pub async fn deadlines(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let policies = DeadlinePolicyRepository::list_all(&state.db).await?;
    let today = today();
    let page = Page::for_user(&state, &admin, "title-deadlines").await;
    let policies = policies
        .into_iter()
        .map(|p| PolicyRow {
            id: p.id.to_string(),
            deadline_date: p.deadline_date.to_string(),
            reminder_frequency_days: p.reminder_frequency_days,
            days_until: p.days_until(today),
            description: p.description,
            email_reminder_enabled: p.email_reminder_enabled,
            is_active: p.is_active,
        })
        .collect();
    Ok(HtmlTemplate(DeadlinesTemplate { page, policies }))
}

#[derive(Debug, Deserialize)]
pub struct DeadlineForm {
    #[serde(default)]
    pub deadline_date: String,
    #[serde(default)]
    pub reminder_frequency_days: String,
    #[serde(default)]
    pub description: String,
    pub email_reminder_enabled: Option<String>,
}

impl DeadlineForm {
    fn parse(&self, t: &I18n) -> Result<DeadlinePolicyInput, String> {
        let deadline_date =
            parse_date(&self.deadline_date).ok_or_else(|| t.get("error-period-required"))?;
        let reminder_frequency_days = match self.reminder_frequency_days.trim() {
            "" => 7,
            value => value.parse().map_err(|_| t.get("error-form-invalid"))?,
        };
        let input = DeadlinePolicyInput {
            deadline_date,
            reminder_frequency_days,
            description: self.description.trim().to_string(),
            email_reminder_enabled: is_checked(&self.email_reminder_enabled),
        };
        input.validate().map_err(|errors| validation_message(t, &errors))?;
        Ok(input)
    }
}

const DEADLINES: &str = "/admin/deadlines";

/// Creates a policy and makes it the only active one.
pub async fn create_deadline(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<DeadlineForm>,
) -> AppResult<Response> {
    let t = I18n::new(state.localizer.clone(), admin.language);
    let input = match form.parse(&t) {
        Ok(input) => input,
        Err(message) => {
            return Ok(flash_message_redirect(
                &state,
                &admin,
                FlashLevel::Error,
                message,
                DEADLINES,
            )
            .await);
        }
    };
    let mut tx = state.db.begin().await?;
    DeadlinePolicyRepository::deactivate_all(&mut tx).await?;
    let policy = DeadlinePolicyRepository::create_active(&mut tx, &input).await?;
    tx.commit().await?;
    tracing::info!(
        policy_id = %policy.id,
        deadline = %policy.deadline_date,
        "Deadline policy activated"
    );
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "deadline-saved", DEADLINES).await)
}

pub async fn update_deadline(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Form(form): Form<DeadlineForm>,
) -> AppResult<Response> {
    let t = I18n::new(state.localizer.clone(), admin.language);
    let input = match form.parse(&t) {
        Ok(input) => input,
        Err(message) => {
            return Ok(flash_message_redirect(
                &state,
                &admin,
                FlashLevel::Error,
                message,
                DEADLINES,
            )
            .await);
        }
    };
    if DeadlinePolicyRepository::update(&state.db, id, &input).await?.is_none() {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            DEADLINES,
        )
        .await);
    }
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "deadline-saved", DEADLINES).await)
}

pub async fn activate_deadline(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let mut tx = state.db.begin().await?;
    DeadlinePolicyRepository::deactivate_all(&mut tx).await?;
    if !DeadlinePolicyRepository::set_active(&mut tx, id, true).await? {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            DEADLINES,
        )
        .await);
    }
    tx.commit().await?;
    tracing::info!(policy_id = %id, "Deadline policy activated");
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "deadline-activated", DEADLINES).await)
}

pub async fn deactivate_deadline(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let mut tx = state.db.begin().await?;
    let found = DeadlinePolicyRepository::set_active(&mut tx, id, false).await?;
    tx.commit().await?;
    if !found {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            DEADLINES,
        )
        .await);
    }
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "deadline-deactivated", DEADLINES).await)
}
