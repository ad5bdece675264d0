//! Upload storage behind a small async trait, with S3 and local-disk backends.

mod local;
mod s3;

pub use local::LocalStorage;
pub use s3::S3Storage;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `bytes` under `folder/filename` and returns the public URL.
    /// A `<uuid><ext>` name is generated when `filename` is `None`.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        filename: Option<&str>,
        content_type: &str,
    ) -> StorageResult<String>;

    async fn delete(&self, url: &str) -> StorageResult<()>;

    async fn exists(&self, url: &str) -> StorageResult<bool>;

    /// A time-limited URL for private access. Backends without signing return the public URL.
    async fn signed_url(&self, url: &str, ttl: Duration) -> StorageResult<String>;
}

/// One file part taken from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

const DOCUMENT_TYPES: &[(&str, &[&str])] = &[
    ("application/pdf", &[".pdf"]),
    ("image/jpeg", &[".jpg", ".jpeg"]),
    ("image/png", &[".png"]),
];

impl UploadedFile {
    /// Lowercased extension including the dot, or empty.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    /// Declared type when specific, otherwise guessed from the name.
    pub fn effective_content_type(&self) -> String {
        let declared = self.content_type.trim().to_lowercase();
        if !declared.is_empty() && declared != "application/octet-stream" {
            return declared;
        }
        mime_guess::from_path(&self.file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    }

    /// Size limit plus PDF, JPEG or PNG by both type and extension.
    pub fn validate_document(&self, max_bytes: usize) -> StorageResult<()> {
        self.validate_against(max_bytes, DOCUMENT_TYPES)
    }

    /// Company logos: JPEG or PNG only.
    pub fn validate_image(&self, max_bytes: usize) -> StorageResult<()> {
        self.validate_against(max_bytes, &DOCUMENT_TYPES[1..])
    }

    fn validate_against(&self, max_bytes: usize, types: &[(&str, &[&str])]) -> StorageResult<()> {
        if self.bytes.len() > max_bytes {
            return Err(StorageError::TooLarge {
                size: self.bytes.len(),
                max: max_bytes,
            });
        }
        let content_type = self.effective_content_type();
        let extension = self.extension();
        let allowed = types
            .iter()
            .any(|(mime, exts)| *mime == content_type && exts.contains(&extension.as_str()));
        if !allowed {
            return Err(StorageError::UnsupportedType(format!(
                "{content_type} ({})",
                self.file_name
            )));
        }
        Ok(())
    }
}

/// Replaces characters that would split a storage key.
pub fn safe_segment(value: &str) -> String {
    value.trim().replace([' ', '/', '\\'], "_")
}

pub fn generated_name(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension)
}

/// `<uuid><ext>` with the extension inferred from the content type.
pub fn default_name(content_type: &str) -> String {
    let extension = match content_type {
        "application/pdf" => ".pdf".to_string(),
        "image/jpeg" => ".jpg".to_string(),
        "image/png" => ".png".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default(),
    };
    generated_name(&extension)
}

/// Recovers a blob key from a stored URL: everything after the last `marker`, query stripped.
pub fn key_from_url(url: &str, marker: &str) -> String {
    let tail = url.rsplit(marker).next().unwrap_or(url);
    tail.split('?').next().unwrap_or(tail).to_string()
}

pub(crate) fn validate_key_part(part: &str) -> StorageResult<()> {
    if part.is_empty() || part.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(StorageError::InvalidName(part.to_string()));
    }
    Ok(())
}

pub fn acceptance_letter_name(student_number: &str, company: &str, extension: &str) -> String {
    format!(
        "letter_{}_{}{}",
        safe_segment(student_number),
        safe_segment(company),
        extension
    )
}

pub fn student_document_name(prefix: &str, student_number: &str, extension: &str) -> String {
    format!("{}_{}{}", prefix, safe_segment(student_number), extension)
}

/// Report files get a short random suffix so revisions never overwrite each other.
pub fn report_file_name(kind: &str, student_number: &str, extension: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "report_{}_{}_{}{}",
        kind,
        safe_segment(student_number),
        &suffix[..8],
        extension
    )
}

pub fn company_logo_name(company: &str, extension: &str) -> String {
    format!("logo_{}{}", safe_segment(company), extension)
}

/// S3 when configured, otherwise files under `MEDIA_DIR` served at `/media`.
pub async fn build_storage(config: &Config) -> anyhow::Result<Arc<dyn FileStorage>> {
    match &config.s3 {
        Some(s3) => {
            tracing::info!(bucket = %s3.bucket_name, "Using S3 upload storage");
            Ok(Arc::new(S3Storage::from_config(s3)))
        }
        None => {
            tracing::info!(dir = %config.app.media_dir, "Using local upload storage");
            Ok(Arc::new(LocalStorage::new(&config.app.media_dir, "/media").await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn file(name: &str, content_type: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.into(),
            content_type: content_type.into(),
            bytes: vec![0; size],
        }
    }

    #[rstest]
    #[case("https://s3.example.test/coop-media/cvs/cv_123.pdf", "coop-media/", "cvs/cv_123.pdf")]
    #[case(
        "https://s3.example.test/coop-media/letters/a.png?X-Amz-Signature=abc",
        "coop-media/",
        "letters/a.png"
    )]
    #[case("/media/cvs/cv_1.pdf", "/media/", "cvs/cv_1.pdf")]
    fn keys_are_recovered_from_urls(#[case] url: &str, #[case] marker: &str, #[case] key: &str) {
        assert_eq!(key_from_url(url, marker), key);
    }

    #[test]
    fn accepts_small_pdf_and_images() {
        assert!(file("letter.pdf", "application/pdf", 1024)
            .validate_document(5 * 1024 * 1024)
            .is_ok());
        assert!(file("scan.JPG", "image/jpeg", 10).validate_document(100).is_ok());
        assert!(file("scan.png", "", 10).validate_document(100).is_ok());
    }

    #[test]
    fn rejects_oversized_files() {
        let err = file("letter.pdf", "application/pdf", 101).validate_document(100);
        assert!(matches!(err, Err(StorageError::TooLarge { size: 101, max: 100 })));
    }

    #[test]
    fn rejects_other_types_and_mismatched_extensions() {
        assert!(matches!(
            file(
                "notes.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                10
            )
            .validate_document(100),
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(file("evil.exe", "application/pdf", 10).validate_document(100).is_err());
        assert!(file("logo.pdf", "application/pdf", 10).validate_image(100).is_err());
        assert!(file("logo.png", "image/png", 10).validate_image(100).is_ok());
    }

    #[test]
    fn file_names_follow_conventions() {
        assert_eq!(
            acceptance_letter_name("2210511", "PT Maju / Jaya", ".pdf"),
            "letter_2210511_PT_Maju___Jaya.pdf"
        );
        assert_eq!(student_document_name("cv", "2210511", ".pdf"), "cv_2210511.pdf");
        let report = report_file_name("final", "2210511", ".pdf");
        assert!(report.starts_with("report_final_2210511_"));
        assert_eq!(report.len(), "report_final_2210511_".len() + 8 + 4);
        assert!(generated_name(".png").ends_with(".png"));
        assert!(default_name("application/pdf").ends_with(".pdf"));
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(validate_key_part("cvs/../../etc").is_err());
        assert!(validate_key_part("").is_err());
        assert!(validate_key_part("cvs/cv_1.pdf").is_ok());
    }
}
