//! Certificate PDF rendering: A4 landscape with a verification QR code.

mod pdf;

pub use pdf::render_pdf;

use thiserror::Error;

use crate::db::repositories::CertificateListing;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("QR code error: {0}")]
    QrCode(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Everything printed on the certificate, already formatted.
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub number: String,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub company_name: String,
    pub position: String,
    pub period: String,
    pub grade: String,
    pub graduation_date: String,
}

impl From<&CertificateListing> for CertificateDocument {
    fn from(listing: &CertificateListing) -> Self {
        Self {
            number: listing.number.clone(),
            student_name: listing.student_name.clone(),
            student_number: listing.student_number.clone(),
            study_program: listing.study_program.clone(),
            company_name: listing.company_name.clone(),
            position: listing.position.clone(),
            period: format!("{} - {}", listing.period_start, listing.period_end),
            grade: format!("{} ({})", listing.grade.letter(), listing.grade.description()),
            graduation_date: listing.graduation_date.to_string(),
        }
    }
}

/// `<base>/<number>/`, the address the QR code points at.
pub fn verification_url(base: &str, number: &str) -> String {
    format!("{}/{}/", base.trim_end_matches('/'), number)
}

/// File name offered for download; slashes in the number are not path-safe.
pub fn download_name(number: &str) -> String {
    format!("sertifikat_{}.pdf", number.replace('/', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_url_keeps_number_slashes() {
        assert_eq!(
            verification_url("https://coop.univ.test/verify/", "COOP/2026/0001/UTS"),
            "https://coop.univ.test/verify/COOP/2026/0001/UTS/"
        );
    }

    #[test]
    fn download_name_is_flat() {
        assert_eq!(download_name("COOP/2026/0007/UTS"), "sertifikat_COOP_2026_0007_UTS.pdf");
    }
}
