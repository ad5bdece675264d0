use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::CurrentUser;
use crate::certificate::{download_name, render_pdf, CertificateDocument};
use crate::db::models::{CertificateStatus, FlashLevel, UserRole};
use crate::db::repositories::CertificateRepository;
use crate::error::AppResult;
use crate::i18n::I18n;
use crate::modules::common::{attachment, flash_redirect, label, HtmlTemplate, Page};

/// Students get their own certificate only; admins get any.
pub async fn download_certificate(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let home = current.user.role.dashboard_path();
    let Some(listing) = CertificateRepository::find_listing(&state.db, id).await? else {
        return Ok(flash_redirect(
            &state,
            &current,
            FlashLevel::Error,
            "error-not-found",
            home,
        )
        .await);
    };

    let allowed = match current.role() {
        UserRole::Admin => true,
        UserRole::Student => listing.student_id == current.user.id,
        _ => false,
    };
    if !allowed {
        tracing::warn!(
            user_id = %current.user.id,
            certificate_id = %id,
            "Certificate download refused"
        );
        return Ok(flash_redirect(
            &state,
            &current,
            FlashLevel::Error,
            "error-access-denied",
            home,
        )
        .await);
    }
    if listing.status == CertificateStatus::Revoked && current.role() == UserRole::Student {
        return Ok(flash_redirect(
            &state,
            &current,
            FlashLevel::Error,
            "error-certificate-revoked",
            home,
        )
        .await);
    }

    let document = CertificateDocument::from(&listing);
    let bytes = render_pdf(&document, &state.env.app.certificate_verify_base)?;
    tracing::info!(certificate_id = %id, number = %listing.number, "Certificate PDF rendered");
    Ok(attachment(bytes, "application/pdf", &download_name(&listing.number)))
}

pub struct VerifiedCertificate {
    pub number: String,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub company_name: String,
    pub period: String,
    pub grade: &'static str,
    pub status: String,
    pub valid: bool,
}

#[derive(Template)]
#[template(path = "verify.html")]
struct VerifyTemplate {
    page: Page,
    number: String,
    certificate: Option<VerifiedCertificate>,
}

/// Public lookup by number; the QR code path ends with a slash.
pub async fn verify_certificate(
    State(state): State<AppState>,
    t: I18n,
    Path(number): Path<String>,
) -> AppResult<impl IntoResponse> {
    let number = number.trim().trim_end_matches('/').to_string();
    let listing = CertificateRepository::find_listing_by_number(&state.db, &number).await?;
    tracing::debug!(%number, found = listing.is_some(), "Certificate verification");

    let certificate = listing.map(|c| VerifiedCertificate {
        status: label(&t, "certificate-status", c.status.as_str()),
        valid: c.status == CertificateStatus::Issued,
        period: format!("{} - {}", c.period_start, c.period_end),
        grade: c.grade.letter(),
        number: c.number,
        student_name: c.student_name,
        student_number: c.student_number,
        study_program: c.study_program,
        company_name: c.company_name,
    });
    Ok(HtmlTemplate(VerifyTemplate {
        page: Page::anonymous(t, "title-verify"),
        number,
        certificate,
    }))
}
