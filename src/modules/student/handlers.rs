use askama::Template;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::StudentUser;
use crate::db::models::{
    ConfirmationStatus, FlashLevel, InternshipConfirmation, NewConfirmation, NewNotification,
    NotificationKind, ProfileDocument, StudentProfile,
};
use crate::db::repositories::{
    CertificateRepository, ConfirmationRepository, DeadlinePolicyRepository,
    NotificationRepository, StudentProfileRepository,
};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::mail::messages::PlacementSummary;
use crate::modules::accounts::provisioning::{link_supervisor, send_invitation};
use crate::modules::common::{
    flash_redirect, label, parse_date, publish_all, today, upload_error_key, validation_message,
    HtmlTemplate, MultipartForm, Page,
};
use crate::storage::{acceptance_letter_name, student_document_name};
use crate::workflow::{
    self, plan_certificate_view, plan_submission, CertificatePlan, SubmissionPlan,
};

const DOCUMENTS: [(&str, ProfileDocument); 4] = [
    ("cv", ProfileDocument::Cv),
    ("portfolio", ProfileDocument::Portfolio),
    ("consultation", ProfileDocument::Consultation),
    ("sptjm", ProfileDocument::Sptjm),
];

pub(crate) async fn require_profile(
    state: &AppState,
    student: &StudentUser,
) -> AppResult<Result<StudentProfile, Response>> {
    match StudentProfileRepository::find_by_user(&state.db, student.user.id).await? {
        Some(profile) => Ok(Ok(profile)),
        None => Ok(Err(flash_redirect(
            state,
            student,
            FlashLevel::Error,
            "error-profile-missing",
            "/student",
        )
        .await)),
    }
}

pub struct ConfirmationSummary {
    pub status: String,
    pub status_code: &'static str,
    pub company_name: String,
    pub position: String,
    pub period: String,
    pub approval_notes: String,
    pub rejection_reason: String,
}

impl ConfirmationSummary {
    fn new(t: &I18n, c: &InternshipConfirmation) -> Self {
        ConfirmationSummary {
            status: label(t, "confirmation-status", c.status.as_str()),
            status_code: c.status.as_str(),
            company_name: c.company_name.clone(),
            position: c.position.clone(),
            period: c.period_label(),
            approval_notes: c.approval_notes.clone().unwrap_or_default(),
            rejection_reason: c.rejection_reason.clone().unwrap_or_default(),
        }
    }
}

// ---- dashboard ----

#[derive(Template)]
#[template(path = "student/dashboard.html")]
struct DashboardTemplate {
    page: Page,
    student_name: String,
    student_number: String,
    study_program: String,
    completion: u8,
    confirmation: Option<ConfirmationSummary>,
    weekly_open: bool,
    deadline: String,
    days_until_deadline: i64,
    certificate_ready: bool,
}

pub async fn dashboard(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<impl IntoResponse> {
    let profile = StudentProfileRepository::find_by_user(&state.db, student.user.id).await?;
    let confirmation = ConfirmationRepository::find_by_student(&state.db, student.user.id).await?;
    let policy = DeadlinePolicyRepository::find_active(&state.db).await?;
    let today = today();

    let page = Page::for_user(&state, &student, "title-student-dashboard").await;
    let weekly_open = workflow::weekly_reporting_open(
        confirmation.as_ref().map(|c| c.status),
        policy.as_ref(),
        today,
    );
    let summary = confirmation.as_ref().map(|c| ConfirmationSummary::new(&page.t, c));

    Ok(HtmlTemplate(DashboardTemplate {
        student_name: profile
            .as_ref()
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| student.user.full_name.clone()),
        student_number: profile.as_ref().map(|p| p.student_number.clone()).unwrap_or_default(),
        study_program: profile.as_ref().map(|p| p.study_program.clone()).unwrap_or_default(),
        completion: profile.as_ref().map(StudentProfile::completion_percentage).unwrap_or(0),
        confirmation: summary,
        weekly_open,
        deadline: policy.as_ref().map(|p| p.deadline_date.to_string()).unwrap_or_default(),
        days_until_deadline: policy.as_ref().map(|p| p.days_until(today)).unwrap_or(0),
        certificate_ready: confirmation.is_some_and(|c| c.status == ConfirmationStatus::Completed),
        page,
    }))
}

// ---- profile ----

pub struct DocumentView {
    pub field: &'static str,
    pub label: String,
    pub url: String,
}

#[derive(Template)]
#[template(path = "student/profile.html")]
struct ProfileTemplate {
    page: Page,
    profile: StudentProfile,
    gender: String,
    completion: u8,
    documents: Vec<DocumentView>,
}

fn document_url(profile: &StudentProfile, document: ProfileDocument) -> Option<&String> {
    match document {
        ProfileDocument::Cv => profile.cv_url.as_ref(),
        ProfileDocument::Portfolio => profile.portfolio_url.as_ref(),
        ProfileDocument::Consultation => profile.consultation_url.as_ref(),
        ProfileDocument::Sptjm => profile.sptjm_url.as_ref(),
    }
}

pub async fn profile(State(state): State<AppState>, student: StudentUser) -> AppResult<Response> {
    let profile = match require_profile(&state, &student).await? {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let page = Page::for_user(&state, &student, "title-profile").await;
    let documents = DOCUMENTS
        .iter()
        .map(|(field, doc)| DocumentView {
            field: *field,
            label: label(&page.t, "document", field),
            url: document_url(&profile, *doc).cloned().unwrap_or_default(),
        })
        .collect();
    Ok(HtmlTemplate(ProfileTemplate {
        gender: label(&page.t, "gender", profile.gender.as_str()),
        completion: profile.completion_percentage(),
        documents,
        profile,
        page,
    })
    .into_response())
}

pub async fn update_profile(
    State(state): State<AppState>,
    student: StudentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    const BACK: &str = "/student/profile";
    let profile = match require_profile(&state, &student).await? {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let form = MultipartForm::read(multipart).await?;

    let full_name = form.text("full_name");
    if full_name.is_empty() {
        return Ok(flash_redirect(
            &state,
            &student,
            FlashLevel::Error,
            "error-form-invalid",
            BACK,
        )
        .await);
    }
    let phone = form.text("phone");
    StudentProfileRepository::update_contact(&state.db, student.user.id, &full_name, &phone)
        .await?;

    let max = state.env.app.max_upload_bytes;
    for (field, document) in DOCUMENTS {
        let Some(file) = form.file(field) else {
            continue;
        };
        if let Err(e) = file.validate_document(max) {
            tracing::info!(field, error = %e, "Rejected profile document");
            return Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Error,
                upload_error_key(&e),
                BACK,
            )
            .await);
        }
        let name =
            student_document_name(document.folder(), &profile.student_number, &file.extension());
        let content_type = file.effective_content_type();
        let url = match state
            .storage
            .upload(file.bytes.clone(), document.folder(), Some(&name), &content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(field, error = %e, "Profile document upload failed");
                return Ok(flash_redirect(
                    &state,
                    &student,
                    FlashLevel::Error,
                    "error-upload-failed",
                    BACK,
                )
                .await);
            }
        };
        let previous =
            StudentProfileRepository::set_document(&state.db, student.user.id, document, &url)
                .await?;
        if let Some(old) = previous.filter(|old| !old.is_empty() && *old != url) {
            if let Err(e) = state.storage.delete(&old).await {
                tracing::warn!(error = %e, url = %old, "Could not remove replaced document");
            }
        }
    }

    Ok(flash_redirect(&state, &student, FlashLevel::Success, "profile-updated", BACK).await)
}

// ---- internship confirmation ----

#[derive(Debug, Default)]
pub struct ConfirmationFormView {
    pub period_start: String,
    pub period_end: String,
    pub position: String,
    pub company_name: String,
    pub company_address: String,
    pub business_field: String,
    pub supervisor_name: String,
    pub supervisor_email: String,
    pub supervisor_phone: String,
    pub acceptance_letter_url: String,
}

impl ConfirmationFormView {
    fn from_record(c: &InternshipConfirmation) -> Self {
        ConfirmationFormView {
            period_start: c.period_start.to_string(),
            period_end: c.period_end.to_string(),
            position: c.position.clone(),
            company_name: c.company_name.clone(),
            company_address: c.company_address.clone(),
            business_field: c.business_field.clone(),
            supervisor_name: c.supervisor_name.clone(),
            supervisor_email: c.supervisor_email.clone(),
            supervisor_phone: c.supervisor_phone.clone(),
            acceptance_letter_url: c.acceptance_letter_url.clone().unwrap_or_default(),
        }
    }

    fn from_form(form: &MultipartForm, existing_letter: Option<&str>) -> Self {
        ConfirmationFormView {
            period_start: form.text("period_start"),
            period_end: form.text("period_end"),
            position: form.text("position"),
            company_name: form.text("company_name"),
            company_address: form.text("company_address"),
            business_field: form.text("business_field"),
            supervisor_name: form.text("supervisor_name"),
            supervisor_email: form.text("supervisor_email"),
            supervisor_phone: form.text("supervisor_phone"),
            acceptance_letter_url: existing_letter.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "student/confirmation.html")]
struct ConfirmationTemplate {
    page: Page,
    form: ConfirmationFormView,
    summary: Option<ConfirmationSummary>,
    editable: bool,
}

pub async fn confirmation_form(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<impl IntoResponse> {
    let existing = ConfirmationRepository::find_by_student(&state.db, student.user.id).await?;
    let page = Page::for_user(&state, &student, "title-confirmation").await;
    let summary = existing.as_ref().map(|c| ConfirmationSummary::new(&page.t, c));
    Ok(HtmlTemplate(ConfirmationTemplate {
        form: existing
            .as_ref()
            .map(ConfirmationFormView::from_record)
            .unwrap_or_default(),
        editable: plan_submission(existing.as_ref()).is_ok(),
        summary,
        page,
    }))
}

async fn confirmation_error(
    state: &AppState,
    student: &StudentUser,
    form: ConfirmationFormView,
    existing: Option<&InternshipConfirmation>,
    message: String,
) -> Response {
    let page = Page::for_user(state, student, "title-confirmation")
        .await
        .notice(FlashLevel::Error, message);
    let summary = existing.map(|c| ConfirmationSummary::new(&page.t, c));
    HtmlTemplate(ConfirmationTemplate {
        page,
        form,
        summary,
        editable: true,
    })
    .into_response()
}

pub async fn submit_confirmation(
    State(state): State<AppState>,
    student: StudentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    const BACK: &str = "/student/confirmation";
    let profile = match require_profile(&state, &student).await? {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let existing = ConfirmationRepository::find_by_student(&state.db, student.user.id).await?;
    let plan = match plan_submission(existing.as_ref()) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::info!(
                user_id = %student.user.id,
                error = %e,
                "Locked confirmation resubmitted"
            );
            return Ok(flash_redirect(
                &state,
                &student,
                FlashLevel::Error,
                "error-confirmation-locked",
                BACK,
            )
            .await);
        }
    };

    let form = MultipartForm::read(multipart).await?;
    let existing_letter = existing.as_ref().and_then(|c| c.acceptance_letter_url.clone());
    let view = ConfirmationFormView::from_form(&form, existing_letter.as_deref());
    let t = I18n::new(state.localizer.clone(), student.language);

    let period = (parse_date(&view.period_start), parse_date(&view.period_end));
    let (Some(period_start), Some(period_end)) = period else {
        let message = t.get("error-period-required");
        return Ok(confirmation_error(&state, &student, view, existing.as_ref(), message).await);
    };

    let mut submission = NewConfirmation {
        period_start,
        period_end,
        position: view.position.clone(),
        company_name: view.company_name.clone(),
        company_address: view.company_address.clone(),
        business_field: view.business_field.clone(),
        supervisor_name: view.supervisor_name.clone(),
        supervisor_email: view.supervisor_email.trim().to_lowercase(),
        supervisor_phone: view.supervisor_phone.clone(),
        acceptance_letter_url: existing_letter.clone(),
    };
    if let Err(errors) = submission.validate() {
        let message = if period_end < period_start {
            t.get("error-period-order")
        } else {
            validation_message(&t, &errors)
        };
        return Ok(confirmation_error(&state, &student, view, existing.as_ref(), message).await);
    }

    if let Some(letter) = form.file("acceptance_letter") {
        if let Err(e) = letter.validate_document(state.env.app.max_upload_bytes) {
            let message = t.get(upload_error_key(&e));
            return Ok(confirmation_error(&state, &student, view, existing.as_ref(), message).await);
        }
        let name = acceptance_letter_name(
            &profile.student_number,
            &submission.company_name,
            &letter.extension(),
        );
        match state
            .storage
            .upload(
                letter.bytes.clone(),
                "acceptance_letters",
                Some(&name),
                &letter.effective_content_type(),
            )
            .await
        {
            Ok(url) => submission.acceptance_letter_url = Some(url),
            Err(e) => {
                tracing::error!(error = %e, "Acceptance letter upload failed");
                let message = t.get("error-upload-failed");
                let response =
                    confirmation_error(&state, &student, view, existing.as_ref(), message).await;
                return Ok(response);
            }
        }
    }

    let mut tx = state.db.begin().await?;
    let link = link_supervisor(&state, &mut tx, &submission).await?;
    let confirmation = match (plan, existing.as_ref()) {
        (SubmissionPlan::OverwritePending, Some(current)) => {
            let updated = ConfirmationRepository::update_pending(
                &mut tx,
                current.id,
                &submission,
                link.user_id,
            )
            .await?;
            match updated {
                Some(updated) => updated,
                None => {
                    return Ok(flash_redirect(
                        &state,
                        &student,
                        FlashLevel::Error,
                        "error-confirmation-locked",
                        BACK,
                    )
                    .await);
                }
            }
        }
        _ => match ConfirmationRepository::create(
            &mut tx,
            student.user.id,
            &submission,
            link.user_id,
        )
        .await
        {
            Ok(created) => created,
            Err(DatabaseError::Duplicate) => {
                return Ok(flash_redirect(
                    &state,
                    &student,
                    FlashLevel::Error,
                    "error-confirmation-locked",
                    BACK,
                )
                .await);
            }
            Err(e) => return Err(e.into()),
        },
    };
    StudentProfileRepository::mark_has_internship(&mut tx, student.user.id).await?;

    let mut notifications = Vec::new();
    if let Some(supervisor_id) = link.user_id {
        let notice = NewNotification::new(
            supervisor_id,
            NotificationKind::Info,
            t.get("notify-confirmation-submitted-title"),
            t.get_with_args(
                "notify-confirmation-submitted",
                &crate::i18n_args!(
                    "student" => profile.full_name.clone(),
                    "company" => confirmation.company_name.clone()
                ),
            ),
        )
        .with_link("/supervisor");
        notifications.push(NotificationRepository::create(&mut *tx, &notice).await?);
    }
    tx.commit().await?;
    publish_all(&state, notifications);

    tracing::info!(
        user_id = %student.user.id,
        confirmation_id = %confirmation.id,
        supervisor_linked = link.user_id.is_some(),
        "Internship confirmation submitted"
    );

    if let Some(invited) = link.invited.as_ref() {
        let placement =
            PlacementSummary::new(&profile.full_name, &profile.study_program, &confirmation);
        send_invitation(&state, invited, &placement).await;
    }

    Ok(flash_redirect(&state, &student, FlashLevel::Success, "confirmation-submitted", BACK).await)
}

// ---- certificate ----

pub struct CertificateView {
    pub id: String,
    pub number: String,
    pub grade: String,
    pub status: String,
    pub revoked: bool,
    pub graduation_date: String,
    pub company_name: String,
    pub period: String,
}

#[derive(Template)]
#[template(path = "student/certificate.html")]
struct CertificateTemplate {
    page: Page,
    certificate: Option<CertificateView>,
}

pub async fn certificate(
    State(state): State<AppState>,
    student: StudentUser,
) -> AppResult<Response> {
    let confirmation =
        ConfirmationRepository::find_by_student(&state.db, student.user.id).await?;
    let Some(confirmation) = confirmation else {
        let page = Page::for_user(&state, &student, "title-certificate").await;
        return Ok(HtmlTemplate(CertificateTemplate { page, certificate: None }).into_response());
    };
    let existing = CertificateRepository::find_for_confirmation(&state.db, confirmation.id).await?;

    let certificate = match plan_certificate_view(&confirmation, existing.as_ref(), today()) {
        Err(_) => {
            let page = Page::for_user(&state, &student, "title-certificate").await;
            let empty = CertificateTemplate { page, certificate: None };
            return Ok(HtmlTemplate(empty).into_response());
        }
        Ok(CertificatePlan::Existing) => {
            existing.ok_or_else(|| AppError::NotFound("certificate".into()))?
        }
        Ok(CertificatePlan::Create {
            grade,
            status,
            graduation_date,
        }) => {
            let mut tx = state.db.begin().await?;
            let created = CertificateRepository::create_numbered(
                &mut tx,
                confirmation.id,
                grade,
                status,
                graduation_date,
                None,
            )
            .await?;
            tx.commit().await?;
            tracing::info!(
                certificate_id = %created.id,
                number = %created.number,
                "Certificate created on first view"
            );
            created
        }
    };

    let listing = CertificateRepository::find_listing(&state.db, certificate.id)
        .await?
        .ok_or_else(|| AppError::NotFound("certificate".into()))?;
    let page = Page::for_user(&state, &student, "title-certificate").await;
    let view = CertificateView {
        id: listing.id.to_string(),
        number: listing.number.clone(),
        grade: format!("{} ({})", listing.grade.letter(), listing.grade.description()),
        status: label(&page.t, "certificate-status", listing.status.as_str()),
        revoked: listing.status == crate::db::models::CertificateStatus::Revoked,
        graduation_date: listing.graduation_date.to_string(),
        company_name: listing.company_name.clone(),
        period: format!("{} - {}", listing.period_start, listing.period_end),
    };
    Ok(HtmlTemplate(CertificateTemplate {
        page,
        certificate: Some(view),
    })
    .into_response())
}
