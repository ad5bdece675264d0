use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::models::{CertificateStatus, ConfirmationStatus, FlashLevel, Grade};
use crate::db::repositories::{CertificateRepository, ConfirmationRepository};
use crate::error::AppResult;
use crate::export::certificates_csv;
use crate::modules::common::{csv_attachment, flash_redirect, label, today, HtmlTemplate, Page};

const CERTIFICATES: &str = "/admin/certificates";

pub struct CertificateRow {
    pub id: String,
    pub number: String,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub company_name: String,
    pub grade: &'static str,
    pub status: String,
    pub status_code: &'static str,
    pub graduation_date: String,
}

pub struct PendingRow {
    pub confirmation_id: String,
    pub student_name: String,
    pub company_name: String,
}

#[derive(Template)]
#[template(path = "admin/certificates.html")]
struct CertificatesTemplate {
    page: Page,
    certificates: Vec<CertificateRow>,
    pending: Vec<PendingRow>,
    grades: Vec<(&'static str, &'static str)>,
}

pub async fn certificates(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let listings = CertificateRepository::list_all(&state.db).await?;
    let pending = CertificateRepository::completed_without_certificate(&state.db).await?;
    let page = Page::for_user(&state, &admin, "title-admin-certificates").await;

    let certificates = listings
        .into_iter()
        .map(|c| CertificateRow {
            id: c.id.to_string(),
            grade: c.grade.letter(),
            status: label(&page.t, "certificate-status", c.status.as_str()),
            status_code: c.status.as_str(),
            graduation_date: c.graduation_date.to_string(),
            number: c.number,
            student_name: c.student_name,
            student_number: c.student_number,
            study_program: c.study_program,
            company_name: c.company_name,
        })
        .collect();
    let pending = pending
        .into_iter()
        .map(|(id, student_name, company_name)| PendingRow {
            confirmation_id: id.to_string(),
            student_name,
            company_name,
        })
        .collect();
    let grades = [Grade::A, Grade::B, Grade::C, Grade::D]
        .into_iter()
        .map(|g| (g.letter(), g.description()))
        .collect();

    Ok(HtmlTemplate(CertificatesTemplate {
        page,
        certificates,
        pending,
        grades,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    pub confirmation_id: Uuid,
    pub grade: String,
}

/// Creates the certificate, or regrades and reissues an existing one.
pub async fn generate_certificate(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<GenerateForm>,
) -> AppResult<Response> {
    let Some(grade) = Grade::parse(&form.grade) else {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-form-invalid",
            CERTIFICATES,
        )
        .await);
    };
    let confirmation = ConfirmationRepository::find_by_id(&state.db, form.confirmation_id).await?;
    let Some(confirmation) = confirmation else {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            CERTIFICATES,
        )
        .await);
    };
    if confirmation.status != ConfirmationStatus::Completed {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-completed",
            CERTIFICATES,
        )
        .await);
    }

    let existing = CertificateRepository::find_for_confirmation(&state.db, confirmation.id).await?;
    let mut tx = state.db.begin().await?;
    let certificate = match existing {
        Some(current) => {
            CertificateRepository::update_grade(&mut tx, current.id, grade, Some(admin.user.id))
                .await?
        }
        None => {
            CertificateRepository::create_numbered(
                &mut tx,
                confirmation.id,
                grade,
                CertificateStatus::Issued,
                today(),
                Some(admin.user.id),
            )
            .await?
        }
    };
    tx.commit().await?;

    tracing::info!(
        certificate_id = %certificate.id,
        number = %certificate.number,
        grade = grade.letter(),
        "Certificate issued by admin"
    );
    Ok(flash_redirect(
        &state,
        &admin,
        FlashLevel::Success,
        "certificate-generated",
        CERTIFICATES,
    )
    .await)
}

async fn change_status(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
    status: CertificateStatus,
    key: &str,
) -> AppResult<Response> {
    if !CertificateRepository::set_status(&state.db, id, status).await? {
        return Ok(flash_redirect(
            state,
            admin,
            FlashLevel::Error,
            "error-not-found",
            CERTIFICATES,
        )
        .await);
    }
    tracing::info!(certificate_id = %id, status = status.as_str(), "Certificate status changed");
    Ok(flash_redirect(state, admin, FlashLevel::Success, key, CERTIFICATES).await)
}

pub async fn revoke_certificate(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    change_status(&state, &admin, id, CertificateStatus::Revoked, "certificate-revoked").await
}

pub async fn issue_certificate(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    change_status(&state, &admin, id, CertificateStatus::Issued, "certificate-issued").await
}

pub async fn export_certificates(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Response> {
    let listings = CertificateRepository::list_all(&state.db).await?;
    let bytes = certificates_csv(&listings)?;
    Ok(csv_attachment(bytes, "laporan_sertifikat.csv"))
}
