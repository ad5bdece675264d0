use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::app_state::AppState;
use crate::auth::session::{language_cookie, with_cookie};
use crate::i18n::{extract_translations_for_client, SupportedLanguage};
use crate::middleware::LanguageExtractor;

/// Keys the notification widget needs when no list is requested.
const CLIENT_KEYS: &[&str] = &[
    "app-name",
    "notifications",
    "notifications-empty",
    "notifications-mark-all",
    "loading",
    "error-generic",
];

#[derive(Debug, Deserialize)]
pub struct TranslationQuery {
    pub keys: Option<String>, // Comma-separated list of keys
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    pub is_default: bool,
}

impl From<SupportedLanguage> for LanguageInfo {
    fn from(lang: SupportedLanguage) -> Self {
        LanguageInfo {
            code: lang.code().to_string(),
            name: lang.name().to_string(),
            is_default: lang == SupportedLanguage::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SupportedLanguagesResponse {
    pub languages: Vec<LanguageInfo>,
    pub default_language: String,
}

#[derive(Debug, Serialize)]
pub struct TranslationsResponse {
    pub translations: HashMap<String, String>,
    pub language: String,
    pub requested_keys: Vec<String>,
}

/// Get all supported languages
pub async fn get_supported_languages() -> Json<SupportedLanguagesResponse> {
    let languages = SupportedLanguage::all()
        .iter()
        .copied()
        .map(LanguageInfo::from)
        .collect();

    Json(SupportedLanguagesResponse {
        languages,
        default_language: SupportedLanguage::default().code().to_string(),
    })
}

/// Get translations for specific keys
pub async fn get_translations(
    State(state): State<AppState>,
    Query(query): Query<TranslationQuery>,
) -> Json<TranslationsResponse> {
    let language = query
        .language
        .and_then(|code| code.parse::<SupportedLanguage>().ok())
        .unwrap_or_default();

    let keys: Vec<String> = match query.keys {
        Some(keys) => keys
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => CLIENT_KEYS.iter().map(|k| k.to_string()).collect(),
    };

    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let translations = extract_translations_for_client(&state.localizer, language, &key_refs);

    Json(TranslationsResponse {
        translations,
        language: language.code().to_string(),
        requested_keys: keys,
    })
}

/// Get current language information
pub async fn get_current_language(req: axum::extract::Request) -> Json<LanguageInfo> {
    Json(LanguageInfo::from(req.get_language()))
}

#[derive(Debug, Deserialize)]
pub struct SetLanguageForm {
    pub language: String,
    pub next: Option<String>,
}

/// Only same-site paths are followed after switching.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

/// Stores the choice in the `lang` cookie and goes back.
pub async fn set_language(Form(form): Form<SetLanguageForm>) -> Response {
    let target = safe_next(form.next.as_deref()).to_string();
    let redirect = Redirect::to(&target).into_response();
    match form.language.parse::<SupportedLanguage>() {
        Ok(language) => {
            tracing::debug!(language = language.code(), "Language switched");
            with_cookie(redirect, language_cookie(language.code()))
        }
        Err(_) => redirect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_path_stays_on_site() {
        assert_eq!(safe_next(Some("/student/profile")), "/student/profile");
        assert_eq!(safe_next(Some("//evil.test")), "/");
        assert_eq!(safe_next(Some("https://evil.test")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
