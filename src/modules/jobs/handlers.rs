use askama::Template;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{CurrentUser, SessionUser, StaffUser, StudentUser};
use crate::db::models::{
    FlashLevel, JobApplicationStatus, JobPosting, JobPostingInput, JobType, NewNotification,
    NotificationKind, UserRole,
};
use crate::db::repositories::{JobRepository, NotificationRepository, StudentProfileRepository};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::modules::common::{
    display_datetime, flash_message_redirect, flash_redirect, label, parse_date, today,
    upload_error_key, validation_message, HtmlTemplate, MultipartForm, Page, SelectOption,
};
use crate::storage::{company_logo_name, generated_name};

const BOARD: &str = "/jobs";
const MANAGE: &str = "/jobs/manage";

/// Admins manage every posting; supervisors only their own.
pub fn may_manage(user: &SessionUser, job: &JobPosting) -> bool {
    match user.user.role {
        UserRole::Admin => true,
        UserRole::Supervisor => job.created_by == Some(user.user.id),
        _ => false,
    }
}

fn job_type_values() -> Vec<&'static str> {
    JobType::all().into_iter().map(JobType::as_str).collect()
}

fn application_status_values() -> Vec<&'static str> {
    JobApplicationStatus::all()
        .into_iter()
        .map(JobApplicationStatus::as_str)
        .collect()
}

// ---- board ----

pub struct JobCard {
    pub id: String,
    pub title: String,
    pub company_name: String,
    pub logo_url: String,
    pub location: String,
    pub job_type: String,
    pub salary_range: String,
    pub deadline: String,
    pub applied: bool,
}

#[derive(Template)]
#[template(path = "jobs/list.html")]
struct JobListTemplate {
    page: Page,
    query: String,
    is_student: bool,
    jobs: Vec<JobCard>,
}

#[derive(Debug, Deserialize)]
pub struct JobSearch {
    pub q: Option<String>,
}

/// Open postings, newest first, optionally filtered by a search term.
pub async fn list_jobs(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(search): Query<JobSearch>,
) -> AppResult<impl IntoResponse> {
    let query = search.q.map(|q| q.trim().to_string()).unwrap_or_default();
    let term = (!query.is_empty()).then_some(query.as_str());
    let jobs = JobRepository::list_open(&state.db, today(), term).await?;

    let is_student = current.role() == UserRole::Student;
    let applied: Vec<Uuid> = if is_student {
        JobRepository::applications_for_student(&state.db, current.user.id)
            .await?
            .into_iter()
            .map(|a| a.job_id)
            .collect()
    } else {
        Vec::new()
    };

    let page = Page::for_user(&state, &current, "title-jobs").await;
    let jobs = jobs
        .into_iter()
        .map(|job| JobCard {
            id: job.id.to_string(),
            job_type: label(&page.t, "job-type", job.job_type.as_str()),
            deadline: job.application_deadline.to_string(),
            applied: applied.contains(&job.id),
            logo_url: job.company_logo_url.unwrap_or_default(),
            title: job.title,
            company_name: job.company_name,
            location: job.location,
            salary_range: job.salary_range,
        })
        .collect();

    Ok(HtmlTemplate(JobListTemplate {
        page,
        query,
        is_student,
        jobs,
    }))
}

pub struct JobView {
    pub id: String,
    pub title: String,
    pub company_name: String,
    pub logo_url: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub job_type: String,
    pub salary_range: String,
    pub deadline: String,
    pub is_open: bool,
}

impl JobView {
    fn new(t: &I18n, job: &JobPosting) -> Self {
        JobView {
            id: job.id.to_string(),
            title: job.title.clone(),
            company_name: job.company_name.clone(),
            logo_url: job.company_logo_url.clone().unwrap_or_default(),
            description: job.description.clone(),
            requirements: job.requirements.clone(),
            location: job.location.clone(),
            job_type: label(t, "job-type", job.job_type.as_str()),
            salary_range: job.salary_range.clone(),
            deadline: job.application_deadline.to_string(),
            is_open: job.is_open(today()),
        }
    }
}

pub struct OwnApplication {
    pub status: String,
    pub applied_at: String,
}

#[derive(Template)]
#[template(path = "jobs/detail.html")]
struct JobDetailTemplate {
    page: Page,
    job: JobView,
    is_student: bool,
    application: Option<OwnApplication>,
    can_manage: bool,
}

pub async fn job_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(job) = JobRepository::find(&state.db, id).await? else {
        return Ok(flash_redirect(
            &state,
            &current,
            FlashLevel::Error,
            "error-not-found",
            BOARD,
        )
        .await);
    };

    let is_student = current.role() == UserRole::Student;
    let own = if is_student {
        JobRepository::applications_for_student(&state.db, current.user.id)
            .await?
            .into_iter()
            .find(|a| a.job_id == job.id)
    } else {
        None
    };

    let page = Page::for_user(&state, &current, "title-job-detail").await;
    let application = own.map(|a| OwnApplication {
        status: label(&page.t, "job-application-status", a.status.as_str()),
        applied_at: display_datetime(Some(a.applied_at)),
    });
    Ok(HtmlTemplate(JobDetailTemplate {
        job: JobView::new(&page.t, &job),
        can_manage: may_manage(&current, &job),
        page,
        is_student,
        application,
    })
    .into_response())
}

// ---- applying ----

#[derive(Template)]
#[template(path = "jobs/apply.html")]
struct ApplyTemplate {
    page: Page,
    job: JobView,
    default_cv: String,
}

/// `Ok(job)` when the student may still apply, otherwise the redirect to show.
async fn open_for_student(
    state: &AppState,
    student: &StudentUser,
    id: Uuid,
) -> AppResult<Result<JobPosting, Response>> {
    let back = format!("/jobs/{id}");
    let Some(job) = JobRepository::find(&state.db, id).await? else {
        return Ok(Err(flash_redirect(
            state,
            student,
            FlashLevel::Error,
            "error-not-found",
            BOARD,
        )
        .await));
    };
    if JobRepository::has_applied(&state.db, job.id, student.user.id).await? {
        return Ok(Err(flash_redirect(
            state,
            student,
            FlashLevel::Warning,
            "job-already-applied",
            &back,
        )
        .await));
    }
    if !job.is_open(today()) {
        return Ok(Err(flash_redirect(
            state,
            student,
            FlashLevel::Error,
            "error-job-closed",
            &back,
        )
        .await));
    }
    Ok(Ok(job))
}

pub async fn apply_form(
    State(state): State<AppState>,
    student: StudentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let job = match open_for_student(&state, &student, id).await? {
        Ok(job) => job,
        Err(redirect) => return Ok(redirect),
    };
    let default_cv = StudentProfileRepository::find_by_user(&state.db, student.user.id)
        .await?
        .and_then(|p| p.cv_url)
        .unwrap_or_default();
    let page = Page::for_user(&state, &student, "title-job-apply").await;
    Ok(HtmlTemplate(ApplyTemplate {
        job: JobView::new(&page.t, &job),
        page,
        default_cv,
    })
    .into_response())
}

/// CV source, in order: an uploaded file, a pasted link, the profile CV.
pub async fn apply_to_job(
    State(state): State<AppState>,
    student: StudentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Response> {
    let job = match open_for_student(&state, &student, id).await? {
        Ok(job) => job,
        Err(redirect) => return Ok(redirect),
    };
    let back = format!("/jobs/{id}/apply");
    let form = MultipartForm::read(multipart).await?;

    let mut cv_url = form.text("cv_url");
    if let Some(file) = form.file("cv_file") {
        if let Err(e) = file.validate_document(state.env.app.max_upload_bytes) {
            return Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Error,
                upload_error_key(&e),
                &back,
            )
            .await);
        }
        let name = generated_name(&file.extension());
        let content_type = file.effective_content_type();
        match state
            .storage
            .upload(file.bytes.clone(), "job_applications", Some(&name), &content_type)
            .await
        {
            Ok(url) => cv_url = url,
            Err(e) => {
                tracing::error!(error = %e, job_id = %job.id, "Application CV upload failed");
                return Ok(flash_redirect(
                    &state,
                    &student,
                    FlashLevel::Error,
                    "error-upload-failed",
                    &back,
                )
                .await);
            }
        }
    }
    if cv_url.is_empty() {
        cv_url = StudentProfileRepository::find_by_user(&state.db, student.user.id)
            .await?
            .and_then(|p| p.cv_url)
            .unwrap_or_default();
    }
    if cv_url.is_empty() {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Error,
            "error-cv-required",
            &back,
        )
        .await);
    }

    let cover_letter = form.text("cover_letter");
    match JobRepository::apply(&state.db, job.id, student.user.id, &cv_url, &cover_letter).await {
        Ok(application) => {
            tracing::info!(
                application_id = %application.id,
                job_id = %job.id,
                "Job application submitted"
            );
            Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Success,
                "job-applied",
                "/jobs/mine",
            )
            .await)
        }
        Err(DatabaseError::Duplicate) => {
            Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Warning,
                "job-already-applied",
                &format!("/jobs/{id}"),
            )
            .await)
        }
        Err(e) => Err(e.into()),
    }
}

pub struct MyApplicationRow {
    pub job_id: String,
    pub title: String,
    pub company_name: String,
    pub status: String,
    pub status_code: &'static str,
    pub applied_at: String,
}

#[derive(Template)]
#[template(path = "jobs/mine.html")]
struct MyApplicationsTemplate {
    page: Page,
    applications: Vec<MyApplicationRow>,
}

pub async fn my_applications(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<impl IntoResponse> {
    let applications = JobRepository::applications_for_student(&state.db, student.user.id).await?;
    let page = Page::for_user(&state, &student, "title-my-applications").await;
    let applications = applications
        .into_iter()
        .map(|a| MyApplicationRow {
            job_id: a.job_id.to_string(),
            status: label(&page.t, "job-application-status", a.status.as_str()),
            status_code: a.status.as_str(),
            applied_at: display_datetime(Some(a.applied_at)),
            title: a.title,
            company_name: a.company_name,
        })
        .collect();
    Ok(HtmlTemplate(MyApplicationsTemplate { page, applications }))
}

// ---- management ----

pub struct ManagedRow {
    pub id: String,
    pub title: String,
    pub company_name: String,
    pub job_type: String,
    pub deadline: String,
    pub is_active: bool,
    pub expired: bool,
}

#[derive(Template)]
#[template(path = "jobs/manage.html")]
struct ManageTemplate {
    page: Page,
    jobs: Vec<ManagedRow>,
}

pub async fn manage_jobs(
    State(state): State<AppState>,
    staff: StaffUser,
) -> AppResult<impl IntoResponse> {
    let owner = (staff.user.role == UserRole::Supervisor).then_some(staff.user.id);
    let jobs = JobRepository::list_managed(&state.db, owner).await?;
    let page = Page::for_user(&state, &staff, "title-manage-jobs").await;
    let now = today();
    let jobs = jobs
        .into_iter()
        .map(|job| ManagedRow {
            id: job.id.to_string(),
            job_type: label(&page.t, "job-type", job.job_type.as_str()),
            deadline: job.application_deadline.to_string(),
            is_active: job.is_active,
            expired: job.is_expired(now),
            title: job.title,
            company_name: job.company_name,
        })
        .collect();
    Ok(HtmlTemplate(ManageTemplate { page, jobs }))
}

/// Values shown in the posting form.
#[derive(Debug, Default)]
pub struct JobFormView {
    pub title: String,
    pub company_name: String,
    pub logo_url: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub salary_range: String,
    pub application_deadline: String,
    pub is_active: bool,
}

impl From<&JobPosting> for JobFormView {
    fn from(job: &JobPosting) -> Self {
        JobFormView {
            title: job.title.clone(),
            company_name: job.company_name.clone(),
            logo_url: job.company_logo_url.clone().unwrap_or_default(),
            description: job.description.clone(),
            requirements: job.requirements.clone(),
            location: job.location.clone(),
            salary_range: job.salary_range.clone(),
            application_deadline: job.application_deadline.to_string(),
            is_active: job.is_active,
        }
    }
}

#[derive(Template)]
#[template(path = "jobs/form.html")]
struct JobFormTemplate {
    page: Page,
    action: String,
    form: JobFormView,
    job_types: Vec<SelectOption>,
}

/// Builds the posting from submitted fields; `Err` holds the message to flash.
pub fn parse_job_form(
    t: &I18n,
    form: &MultipartForm,
    logo_url: Option<String>,
) -> Result<JobPostingInput, String> {
    let Some(job_type) = JobType::parse(&form.text("job_type")) else {
        return Err(t.get("error-job-type"));
    };
    let Some(application_deadline) = parse_date(&form.text("application_deadline")) else {
        return Err(t.get("error-date-invalid"));
    };
    let input = JobPostingInput {
        title: form.text("title"),
        company_name: form.text("company_name"),
        company_logo_url: logo_url,
        description: form.text("description"),
        requirements: form.text("requirements"),
        location: form.text("location"),
        job_type,
        salary_range: form.text("salary_range"),
        application_deadline,
        is_active: form.checked("is_active"),
    };
    input.validate().map_err(|errors| validation_message(t, &errors))?;
    Ok(input)
}

/// Uploads a new logo when one was attached; keeps `current` otherwise.
async fn store_logo(
    state: &AppState,
    form: &MultipartForm,
    current: Option<String>,
) -> Result<Option<String>, &'static str> {
    let Some(file) = form.file("company_logo") else {
        return Ok(current);
    };
    file.validate_image(state.env.app.max_upload_bytes)
        .map_err(|e| upload_error_key(&e))?;
    let name = company_logo_name(&form.text("company_name"), &file.extension());
    match state
        .storage
        .upload(file.bytes.clone(), "company_logos", Some(&name), &file.effective_content_type())
        .await
    {
        Ok(url) => Ok(Some(url)),
        Err(e) => {
            tracing::error!(error = %e, "Company logo upload failed");
            Err("error-upload-failed")
        }
    }
}

pub async fn new_job(
    State(state): State<AppState>,
    staff: StaffUser,
) -> AppResult<impl IntoResponse> {
    let page = Page::for_user(&state, &staff, "title-job-new").await;
    let job_types = SelectOption::list(
        &page.t,
        "job-type",
        &job_type_values(),
        JobType::Internship.as_str(),
    );
    Ok(HtmlTemplate(JobFormTemplate {
        page,
        action: "/jobs/new".to_string(),
        form: JobFormView {
            is_active: true,
            ..JobFormView::default()
        },
        job_types,
    }))
}

pub async fn create_job(
    State(state): State<AppState>,
    staff: StaffUser,
    multipart: Multipart,
) -> AppResult<Response> {
    const BACK: &str = "/jobs/new";
    let form = MultipartForm::read(multipart).await?;
    let logo_url = match store_logo(&state, &form, None).await {
        Ok(url) => url,
        Err(key) => return Ok(flash_redirect(&state, &staff, FlashLevel::Error, key, BACK).await),
    };
    let t = I18n::new(state.localizer.clone(), staff.language);
    let input = match parse_job_form(&t, &form, logo_url) {
        Ok(input) => input,
        Err(message) => {
            return Ok(flash_message_redirect(
                &state,
                &staff,
                FlashLevel::Error,
                message,
                BACK,
            )
            .await);
        }
    };

    let job = JobRepository::create(&state.db, &input, staff.user.id).await?;
    tracing::info!(job_id = %job.id, created_by = %staff.user.id, "Job posting created");
    let message = t.get_with_args("job-created", &crate::i18n_args!("title" => job.title.clone()));
    Ok(flash_message_redirect(&state, &staff, FlashLevel::Success, message, MANAGE).await)
}

/// `Ok(job)` when it exists and this staff member may change it.
async fn managed_job(
    state: &AppState,
    staff: &StaffUser,
    id: Uuid,
) -> AppResult<Result<JobPosting, Response>> {
    let Some(job) = JobRepository::find(&state.db, id).await? else {
        return Ok(Err(flash_redirect(
            state,
            staff,
            FlashLevel::Error,
            "error-not-found",
            MANAGE,
        )
        .await));
    };
    if !may_manage(staff, &job) {
        tracing::warn!(user_id = %staff.user.id, job_id = %id, "Job management refused");
        return Ok(Err(flash_redirect(
            state,
            staff,
            FlashLevel::Error,
            "error-access-denied",
            MANAGE,
        )
        .await));
    }
    Ok(Ok(job))
}

pub async fn edit_job(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let job = match managed_job(&state, &staff, id).await? {
        Ok(job) => job,
        Err(redirect) => return Ok(redirect),
    };
    let page = Page::for_user(&state, &staff, "title-job-edit").await;
    let job_types =
        SelectOption::list(&page.t, "job-type", &job_type_values(), job.job_type.as_str());
    Ok(HtmlTemplate(JobFormTemplate {
        page,
        action: format!("/jobs/{id}/edit"),
        form: JobFormView::from(&job),
        job_types,
    })
    .into_response())
}

pub async fn update_job(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Response> {
    let job = match managed_job(&state, &staff, id).await? {
        Ok(job) => job,
        Err(redirect) => return Ok(redirect),
    };
    let back = format!("/jobs/{id}/edit");
    let form = MultipartForm::read(multipart).await?;
    let logo_url = match store_logo(&state, &form, job.company_logo_url.clone()).await {
        Ok(url) => url,
        Err(key) => return Ok(flash_redirect(&state, &staff, FlashLevel::Error, key, &back).await),
    };
    let t = I18n::new(state.localizer.clone(), staff.language);
    let input = match parse_job_form(&t, &form, logo_url) {
        Ok(input) => input,
        Err(message) => {
            return Ok(flash_message_redirect(
                &state,
                &staff,
                FlashLevel::Error,
                message,
                &back,
            )
            .await);
        }
    };

    let Some(updated) = JobRepository::update(&state.db, id, &input).await? else {
        return Ok(flash_redirect(
            &state,
            &staff,
            FlashLevel::Error,
            "error-not-found",
            MANAGE,
        )
        .await);
    };
    tracing::info!(job_id = %updated.id, "Job posting updated");
    let message =
        t.get_with_args("job-updated", &crate::i18n_args!("title" => updated.title.clone()));
    Ok(flash_message_redirect(&state, &staff, FlashLevel::Success, message, MANAGE).await)
}

pub async fn delete_job(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if let Err(redirect) = managed_job(&state, &staff, id).await? {
        return Ok(redirect);
    }
    let Some(deleted) = JobRepository::delete(&state.db, id).await? else {
        return Ok(flash_redirect(
            &state,
            &staff,
            FlashLevel::Error,
            "error-not-found",
            MANAGE,
        )
        .await);
    };
    if let Some(logo) = &deleted.company_logo_url {
        if let Err(e) = state.storage.delete(logo).await {
            tracing::warn!(error = %e, job_id = %id, "Failed to delete company logo");
        }
    }
    tracing::info!(job_id = %id, "Job posting deleted");
    let t = I18n::new(state.localizer.clone(), staff.language);
    let message = t.get_with_args("job-deleted", &crate::i18n_args!("title" => deleted.title));
    Ok(flash_message_redirect(&state, &staff, FlashLevel::Success, message, MANAGE).await)
}

// ---- applications ----

pub struct ApplicationRow {
    pub id: String,
    pub student_name: String,
    pub student_number: String,
    pub student_email: String,
    pub cv_url: String,
    pub cover_letter: String,
    pub status: String,
    pub notes: String,
    pub applied_at: String,
    pub statuses: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "jobs/applications.html")]
struct ApplicationsTemplate {
    page: Page,
    job: JobView,
    applications: Vec<ApplicationRow>,
}

pub async fn job_applications(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let job = match managed_job(&state, &staff, id).await? {
        Ok(job) => job,
        Err(redirect) => return Ok(redirect),
    };
    let applications = JobRepository::applications_for_job(&state.db, job.id).await?;
    let page = Page::for_user(&state, &staff, "title-job-applications").await;
    let statuses = application_status_values();
    let applications = applications
        .into_iter()
        .map(|row| {
            let a = row.application;
            ApplicationRow {
                id: a.id.to_string(),
                status: label(&page.t, "job-application-status", a.status.as_str()),
                statuses: SelectOption::list(
                    &page.t,
                    "job-application-status",
                    &statuses,
                    a.status.as_str(),
                ),
                applied_at: display_datetime(Some(a.applied_at)),
                cv_url: a.cv_url,
                cover_letter: a.cover_letter,
                notes: a.notes,
                student_name: row.student_name,
                student_number: row.student_number,
                student_email: row.student_email,
            }
        })
        .collect();
    Ok(HtmlTemplate(ApplicationsTemplate {
        job: JobView::new(&page.t, &job),
        page,
        applications,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ApplicationStatusForm {
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

/// Sets the status and tells the applicant.
pub async fn update_application_status(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    Form(form): Form<ApplicationStatusForm>,
) -> AppResult<Response> {
    let Some(application) = JobRepository::find_application(&state.db, id).await? else {
        return Ok(flash_redirect(
            &state,
            &staff,
            FlashLevel::Error,
            "error-not-found",
            MANAGE,
        )
        .await);
    };
    let job = match managed_job(&state, &staff, application.job_id).await? {
        Ok(job) => job,
        Err(redirect) => return Ok(redirect),
    };
    let back = format!("/jobs/{}/applications", job.id);
    let Some(status) = JobApplicationStatus::parse(&form.status) else {
        return Ok(flash_redirect(
            &state,
            &staff,
            FlashLevel::Error,
            "error-form-invalid",
            &back,
        )
        .await);
    };

    if !JobRepository::update_application_status(&state.db, id, status, &form.notes).await? {
        return Err(AppError::NotFound("job application".into()));
    }
    tracing::info!(
        application_id = %id,
        status = status.as_str(),
        "Job application status updated"
    );

    let t = I18n::new(state.localizer.clone(), staff.language);
    let status_label = label(&t, "job-application-status", status.as_str());
    let kind = match status {
        JobApplicationStatus::Accepted => NotificationKind::Success,
        JobApplicationStatus::Rejected => NotificationKind::Danger,
        _ => NotificationKind::Info,
    };
    let notice = NewNotification::new(
        application.student_id,
        kind,
        t.get("notify-application-status-title"),
        t.get_with_args(
            "notify-application-status",
            &crate::i18n_args!("title" => job.title.clone(), "status" => status_label.clone()),
        ),
    )
    .with_link(format!("/jobs/{}", job.id));
    match NotificationRepository::create(&state.db, &notice).await {
        Ok(notification) => state.publish(notification),
        Err(e) => tracing::warn!(error = %e, application_id = %id, "Failed to notify applicant"),
    }

    let message = t.get_with_args(
        "application-status-updated",
        &crate::i18n_args!("status" => status_label),
    );
    Ok(flash_message_redirect(&state, &staff, FlashLevel::Success, message, &back).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::User;
    use crate::i18n::{FluentLoader, Localizer, SupportedLanguage};
    use std::sync::Arc;
    use time::{macros::date, OffsetDateTime};

    fn session(role: UserRole) -> SessionUser {
        let now = OffsetDateTime::now_utc();
        SessionUser {
            user: User {
                id: Uuid::new_v4(),
                email: "staff@coop.test".into(),
                password_hash: None,
                full_name: "Staff".into(),
                role,
                must_change_password: false,
                is_active: true,
                created_at: now,
                updated_at: now,
                last_login_at: None,
            },
            session_id: "s".into(),
            language: SupportedLanguage::Indonesian,
        }
    }

    fn posting(created_by: Option<Uuid>) -> JobPosting {
        let now = OffsetDateTime::now_utc();
        JobPosting {
            id: Uuid::new_v4(),
            title: "Backend intern".into(),
            company_name: "PT Kode".into(),
            company_logo_url: None,
            description: "APIs".into(),
            requirements: String::new(),
            location: "Bandung".into(),
            job_type: JobType::Internship,
            salary_range: String::new(),
            application_deadline: date!(2026 - 12 - 31),
            is_active: true,
            created_by,
            posted_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn supervisors_manage_only_their_postings() {
        let supervisor = session(UserRole::Supervisor);
        assert!(may_manage(&supervisor, &posting(Some(supervisor.user.id))));
        assert!(!may_manage(&supervisor, &posting(Some(Uuid::new_v4()))));
        assert!(!may_manage(&supervisor, &posting(None)));
    }

    #[test]
    fn admins_manage_everything_and_students_nothing() {
        let admin = session(UserRole::Admin);
        assert!(may_manage(&admin, &posting(None)));
        let student = session(UserRole::Student);
        assert!(!may_manage(&student, &posting(Some(student.user.id))));
    }

    #[test]
    fn rejects_unknown_job_type() {
        let t = I18n::new(
            Arc::new(Localizer::new(FluentLoader::new("unused"))),
            SupportedLanguage::Indonesian,
        );
        let form = MultipartForm::default();
        assert_eq!(parse_job_form(&t, &form, None).unwrap_err(), "error-job-type");
    }
}
