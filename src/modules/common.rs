//! Pieces every page handler shares: template rendering, the layout context,
//! flash-and-redirect responses, form parsing and file downloads.

use askama::Template;
use axum::{
    extract::Multipart,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use time::{macros::format_description, Date, OffsetDateTime, PrimitiveDateTime};
use tracing::error;
use validator::ValidationErrors;

use crate::app_state::AppState;
use crate::auth::{take_flash, SessionUser};
use crate::auth::session::push_flash;
use crate::db::models::{FlashLevel, FlashMessage, Notification, UserRole};
use crate::error::{AppError, AppResult};
use crate::i18n::{I18n, SupportedLanguage};
use crate::storage::{StorageError, UploadedFile};

pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Failed to render template: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

pub struct NavLink {
    pub href: &'static str,
    pub label: String,
}

pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
    pub selected: bool,
}

pub struct PageUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Layout data rendered by `base.html` around every page.
pub struct Page {
    pub t: I18n,
    pub title: String,
    pub user: Option<PageUser>,
    pub nav: Vec<NavLink>,
    pub flash: Vec<FlashMessage>,
    pub languages: Vec<LanguageOption>,
}

fn nav_links(role: UserRole, i18n: &I18n) -> Vec<NavLink> {
    let links: &[(&'static str, &str)] = match role {
        UserRole::Student => &[
            ("/student", "nav-dashboard"),
            ("/student/profile", "nav-profile"),
            ("/student/confirmation", "nav-confirmation"),
            ("/student/progress-reports", "nav-progress-reports"),
            ("/student/final-report", "nav-final-report"),
            ("/student/weekly-reports", "nav-weekly-reports"),
            ("/student/certificate", "nav-certificate"),
            ("/jobs", "nav-jobs"),
            ("/jobs/mine", "nav-my-applications"),
        ],
        UserRole::Supervisor => &[
            ("/supervisor", "nav-dashboard"),
            ("/jobs/manage", "nav-manage-jobs"),
        ],
        UserRole::Admin => &[
            ("/admin", "nav-dashboard"),
            ("/admin/templates", "nav-templates"),
            ("/admin/tracking", "nav-tracking"),
            ("/admin/progress-reports", "nav-progress-reports"),
            ("/admin/final-reports", "nav-final-reports"),
            ("/admin/weekly-reports", "nav-weekly-reports"),
            ("/admin/deadlines", "nav-deadlines"),
            ("/admin/certificates", "nav-certificates"),
            ("/jobs/manage", "nav-manage-jobs"),
            ("/accounts/supervisors", "nav-supervisors"),
            ("/accounts/department-heads", "nav-department-heads"),
        ],
        UserRole::DepartmentHead => &[("/kaprodi", "nav-dashboard")],
    };
    links
        .iter()
        .map(|(href, key)| NavLink {
            href: *href,
            label: i18n.get(key),
        })
        .collect()
}

fn language_options(current: SupportedLanguage) -> Vec<LanguageOption> {
    SupportedLanguage::all()
        .iter()
        .map(|lang| LanguageOption {
            code: lang.code(),
            name: lang.name(),
            selected: *lang == current,
        })
        .collect()
}

impl Page {
    /// Layout for a logged-in user; drains the session's pending flash messages.
    pub async fn for_user(state: &AppState, session: &SessionUser, title_key: &str) -> Self {
        let t = I18n::new(state.localizer.clone(), session.language);
        let flash = take_flash(state, &session.session_id).await;
        Page {
            title: t.get(title_key),
            user: Some(PageUser {
                name: session.user.full_name.clone(),
                email: session.user.email.clone(),
                role: t.get(&format!("role-{}", session.user.role.as_str())),
            }),
            nav: nav_links(session.user.role, &t),
            flash,
            languages: language_options(session.language),
            t,
        }
    }

    pub fn anonymous(t: I18n, title_key: &str) -> Self {
        Page {
            title: t.get(title_key),
            user: None,
            nav: Vec::new(),
            flash: Vec::new(),
            languages: language_options(t.language()),
            t,
        }
    }

    /// Adds a message rendered on this page instead of the next one.
    pub fn notice(mut self, level: FlashLevel, message: impl Into<String>) -> Self {
        self.flash.push(FlashMessage::new(level, message));
        self
    }

    pub fn notice_key(self, level: FlashLevel, key: &str) -> Self {
        let message = self.t.get(key);
        self.notice(level, message)
    }
}

/// One `<option>` of a select box.
pub struct SelectOption {
    pub value: &'static str,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn list(t: &I18n, prefix: &str, values: &[&'static str], current: &str) -> Vec<Self> {
        values
            .iter()
            .map(|value| SelectOption {
                value: *value,
                label: label(t, prefix, value),
                selected: *value == current,
            })
            .collect()
    }
}

/// Localized name of an enum value, looked up as `<prefix>-<value>`.
pub fn label(t: &I18n, prefix: &str, value: &str) -> String {
    t.get(&format!("{prefix}-{value}"))
}

/// Queues a localized flash message and redirects.
pub async fn flash_redirect(
    state: &AppState,
    session: &SessionUser,
    level: FlashLevel,
    key: &str,
    to: &str,
) -> Response {
    let message = state.localizer.get_string_for_language(&session.language, key);
    flash_message_redirect(state, session, level, message, to).await
}

pub async fn flash_message_redirect(
    state: &AppState,
    session: &SessionUser,
    level: FlashLevel,
    message: String,
    to: &str,
) -> Response {
    push_flash(state, &session.session_id, level, message).await;
    Redirect::to(to).into_response()
}

/// Sends committed notifications to the recipients' open sockets.
pub fn publish_all(state: &AppState, notifications: Vec<Notification>) {
    for notification in notifications {
        state.publish(notification);
    }
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Parses an `<input type="date">` value.
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Parses an `<input type="datetime-local">` value as UTC.
pub fn parse_datetime_local(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(value, without_seconds)
        .or_else(|_| PrimitiveDateTime::parse(value, with_seconds))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

pub fn datetime_input(value: Option<OffsetDateTime>) -> String {
    value
        .map(|t| {
            format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}",
                t.year(),
                u8::from(t.month()),
                t.day(),
                t.hour(),
                t.minute()
            )
        })
        .unwrap_or_default()
}

pub fn display_datetime(value: Option<OffsetDateTime>) -> String {
    crate::export::format_timestamp(value)
}

/// HTML checkboxes send their value only when ticked.
pub fn is_checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("on" | "true" | "1" | "yes"))
}

/// Sorted, comma separated names of the fields that failed validation.
pub fn invalid_fields(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
    fields.sort_unstable();
    fields.join(", ")
}

pub fn validation_message(t: &I18n, errors: &ValidationErrors) -> String {
    let fields = invalid_fields(errors);
    if fields.is_empty() || fields == "__all__" {
        return t.get("error-form-invalid");
    }
    t.get_with_args("error-invalid-fields", &crate::i18n_args!("fields" => fields))
}

/// Localization key for a rejected upload.
pub fn upload_error_key(err: &StorageError) -> &'static str {
    match err {
        StorageError::TooLarge { .. } => "error-file-too-large",
        StorageError::UnsupportedType(_) => "error-file-type",
        _ => "error-upload-failed",
    }
}

/// A fully buffered multipart form: text fields plus non-empty file parts.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;

            match file_name {
                Some(file_name) if !file_name.is_empty() && !bytes.is_empty() => {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                Some(_) => {}
                None => {
                    form.fields
                        .insert(name, String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    pub fn checked(&self, name: &str) -> bool {
        is_checked(&self.fields.get(name).cloned())
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

fn with_header(mut response: Response, name: header::HeaderName, value: &str) -> Response {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(e) => error!(error = %e, "Invalid header value"),
    }
    response
}

/// A file download with a suggested name.
pub fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    let response = with_header(bytes.into_response(), header::CONTENT_TYPE, content_type);
    with_header(
        response,
        header::CONTENT_DISPOSITION,
        &format!("attachment; filename=\"{file_name}\""),
    )
}

pub fn csv_attachment(bytes: Vec<u8>, file_name: &str) -> Response {
    attachment(bytes, "text/csv; charset=utf-8", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use validator::Validate;

    #[test]
    fn parses_form_dates() {
        assert_eq!(parse_date("2026-02-01"), Some(date!(2026 - 02 - 01)));
        assert_eq!(parse_date(" 2026-02-01 "), Some(date!(2026 - 02 - 01)));
        assert_eq!(parse_date("01/02/2026"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn parses_datetime_local_with_and_without_seconds() {
        assert_eq!(
            parse_datetime_local("2026-03-01T08:30"),
            Some(datetime!(2026-03-01 08:30 UTC))
        );
        assert_eq!(
            parse_datetime_local("2026-03-01T08:30:15"),
            Some(datetime!(2026-03-01 08:30:15 UTC))
        );
        assert_eq!(parse_datetime_local(""), None);
    }

    #[test]
    fn datetime_input_round_trips_minutes() {
        let value = datetime_input(Some(datetime!(2026-03-01 08:30 UTC)));
        assert_eq!(value, "2026-03-01T08:30");
        assert_eq!(parse_datetime_local(&value), Some(datetime!(2026-03-01 08:30 UTC)));
        assert_eq!(datetime_input(None), "");
    }

    #[test]
    fn checkbox_values() {
        assert!(is_checked(&Some("on".into())));
        assert!(is_checked(&Some("true".into())));
        assert!(!is_checked(&None));
        assert!(!is_checked(&Some("off".into())));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1))]
        title: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn lists_invalid_fields_in_order() {
        let sample = Sample {
            title: String::new(),
            email: "not-an-email".into(),
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(invalid_fields(&errors), "email, title");
    }

    #[test]
    fn upload_errors_have_specific_messages() {
        assert_eq!(
            upload_error_key(&StorageError::TooLarge { size: 10, max: 5 }),
            "error-file-too-large"
        );
        assert_eq!(
            upload_error_key(&StorageError::UnsupportedType("text/plain".into())),
            "error-file-type"
        );
        assert_eq!(
            upload_error_key(&StorageError::Backend("down".into())),
            "error-upload-failed"
        );
    }

    #[test]
    fn attachments_carry_disposition() {
        let response = csv_attachment(b"a,b\n".to_vec(), "report.csv");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.csv\""
        );
    }
}
